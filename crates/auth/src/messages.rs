//! User-facing denial reasons.

use serde::{Deserialize, Serialize};

use crate::policy::DenialKind;

/// Language used for denial reasons surfaced to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    PtBr,
}

impl Locale {
    /// Parse a locale tag (`en`, `pt_br`, `pt-BR`, ...). Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "en" | "en_us" | "en_gb" => Some(Locale::En),
            "pt" | "pt_br" => Some(Locale::PtBr),
            _ => None,
        }
    }
}

/// Render the reason for a denial. `detail` is the permission name for
/// `MissingPermission` and ignored otherwise.
pub fn reason(kind: DenialKind, locale: Locale, detail: Option<&str>) -> String {
    let detail = detail.unwrap_or_default();
    match (locale, kind) {
        (Locale::En, DenialKind::MissingPermission) => format!("missing permission '{detail}'"),
        (Locale::En, DenialKind::SelfDemotion) => {
            "cannot change your own role while holding the top role".into()
        }
        (Locale::En, DenialKind::HigherRole) => "cannot assign higher role".into(),
        (Locale::En, DenialKind::TopRoleReserved) => "only the top role can assign the top role".into(),
        (Locale::En, DenialKind::TeamRestriction) => "cannot assign roles outside your team".into(),
        (Locale::En, DenialKind::SelfImpersonation) => "cannot impersonate yourself".into(),
        (Locale::En, DenialKind::InactiveTarget) => "cannot impersonate an inactive user".into(),
        (Locale::En, DenialKind::SeniorTarget) => {
            "cannot impersonate a user with an equal or higher role".into()
        }
        (Locale::En, DenialKind::AlreadyImpersonating) => "already impersonating another user".into(),
        (Locale::En, DenialKind::NotImpersonating) => "not impersonating anyone".into(),

        (Locale::PtBr, DenialKind::MissingPermission) => format!("permissão ausente '{detail}'"),
        (Locale::PtBr, DenialKind::SelfDemotion) => {
            "não é possível alterar o próprio papel enquanto detém o papel máximo".into()
        }
        (Locale::PtBr, DenialKind::HigherRole) => "não é possível atribuir um papel superior".into(),
        (Locale::PtBr, DenialKind::TopRoleReserved) => {
            "somente o papel máximo pode atribuir o papel máximo".into()
        }
        (Locale::PtBr, DenialKind::TeamRestriction) => {
            "não é possível atribuir papéis fora da sua equipe".into()
        }
        (Locale::PtBr, DenialKind::SelfImpersonation) => "não é possível personificar a si mesmo".into(),
        (Locale::PtBr, DenialKind::InactiveTarget) => {
            "não é possível personificar um usuário inativo".into()
        }
        (Locale::PtBr, DenialKind::SeniorTarget) => {
            "não é possível personificar um usuário com papel igual ou superior".into()
        }
        (Locale::PtBr, DenialKind::AlreadyImpersonating) => {
            "já está personificando outro usuário".into()
        }
        (Locale::PtBr, DenialKind::NotImpersonating) => "não está personificando nenhum usuário".into(),
    }
}
