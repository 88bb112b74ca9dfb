// FICHIER : evorun/src/utils/macros.rs

/// Affiche une info à l'opérateur et logue l'événement
#[macro_export]
macro_rules! user_info {
    ($key:expr) => {{
        println!("{}", $key);
        tracing::info!(event = "user_notification", key = $key);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let full_msg = format!($($arg)*);
        println!("{}", full_msg);
        tracing::info!(event = "user_notification", key = $key, message = %full_msg);
    }};
}

/// Affiche un succès à l'opérateur
#[macro_export]
macro_rules! user_success {
    ($key:expr) => {{
        println!("✅ {}", $key);
        tracing::info!(event = "user_success", key = $key);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let full_msg = format!($($arg)*);
        println!("✅ {}", full_msg);
        tracing::info!(event = "user_success", key = $key, message = %full_msg);
    }};
}

/// Signale une anomalie non fatale (job relancé, fichier vide...)
#[macro_export]
macro_rules! user_warn {
    ($key:expr, $($arg:tt)*) => {{
        let full_msg = format!($($arg)*);
        eprintln!("⚠️  {}", full_msg);
        tracing::warn!(event = "user_warning", key = $key, message = %full_msg);
    }};
}

/// Affiche une erreur à l'opérateur ET logue la structure technique enrichie
#[macro_export]
macro_rules! user_error {
    // Format enrichi : composant + action, pour le fichier JSON
    (
        $key:expr,
        error = $err:expr,
        component = $comp:expr,
        action = $action:expr
    ) => {{
        eprintln!("❌ [{}] {} : {}", $comp, $key, $err);
        tracing::error!(
            service = "evorun", componentName = $comp, action = $action,
            error = %$err, event = "user_error", key = $key
        );
    }};

    // Clé + Arguments de formatage
    // (Doit toujours être placé à la fin pour ne pas intercepter la syntaxe du dessus)
    ($key:expr, $($arg:tt)*) => {{
        let full_msg = format!($($arg)*);
        eprintln!("❌ {}", full_msg);
        tracing::error!(event = "user_error", key = $key, message = %full_msg);
    }};
}
