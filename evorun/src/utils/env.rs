use std::env;

/// Récupère une variable d'environnement (Optionnel).
/// Une valeur vide est traitée comme absente.
pub fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Récupère une variable d'environnement avec valeur par défaut.
pub fn get_or(key: &str, default: &str) -> String {
    get_optional(key).unwrap_or_else(|| default.to_string())
}

/// Propriétaire de la file batch : `USER`, puis `LOGNAME`.
pub fn current_user() -> Option<String> {
    get_optional("USER").or_else(|| get_optional("LOGNAME"))
}
