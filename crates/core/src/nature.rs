//! Nature resolution.
//!
//! An occurrence may carry a "nature" (fire, rescue, ...) that selects the detail form of
//! the wizard's second step. The forms mark natures through the `formsFilled` flags.
//! Nothing stops several flags from being set at once, so resolution is
//! priority-ordered and always yields at most one active nature.
//!
//! The order is fixed in [`NatureKey::PRIORITY`]:
//!
//! ```text
//! incendio > salvamento > aph > prevencao > atividadeComunitaria
//!          > gestaoIncidente > produtosPerigosos > outro
//! ```

use crate::constants::BASIC_OCCURRENCE_LABEL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nature of an occurrence, keyed by its wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NatureKey {
    /// Fire.
    Incendio,
    /// Rescue.
    Salvamento,
    /// Pre-hospital care.
    Aph,
    /// Hazardous materials.
    ProdutosPerigosos,
    /// Prevention activity.
    Prevencao,
    /// Community activity.
    AtividadeComunitaria,
    /// Incident-management briefing.
    GestaoIncidente,
    /// Anything that fits no other nature.
    Outro,
}

impl NatureKey {
    /// Resolution order, highest priority first.
    pub const PRIORITY: [NatureKey; 8] = [
        NatureKey::Incendio,
        NatureKey::Salvamento,
        NatureKey::Aph,
        NatureKey::Prevencao,
        NatureKey::AtividadeComunitaria,
        NatureKey::GestaoIncidente,
        NatureKey::ProdutosPerigosos,
        NatureKey::Outro,
    ];

    /// Wire key used in `formsFilled` and as the detail object's key.
    pub fn wire_key(self) -> &'static str {
        match self {
            NatureKey::Incendio => "incendio",
            NatureKey::Salvamento => "salvamento",
            NatureKey::Aph => "aph",
            NatureKey::ProdutosPerigosos => "produtosPerigosos",
            NatureKey::Prevencao => "prevencao",
            NatureKey::AtividadeComunitaria => "atividadeComunitaria",
            NatureKey::GestaoIncidente => "gestaoIncidente",
            NatureKey::Outro => "outro",
        }
    }

    /// Human label shown on the dashboard `tipo` column.
    pub fn display_label(self) -> &'static str {
        match self {
            NatureKey::Incendio => "Incêndio",
            NatureKey::Salvamento => "Salvamento",
            NatureKey::Aph => "Atendimento Pré-Hospitalar",
            NatureKey::ProdutosPerigosos => "Produtos Perigosos",
            NatureKey::Prevencao => "Prevenção",
            NatureKey::AtividadeComunitaria => "Atividade Comunitária",
            NatureKey::GestaoIncidente => "Gestão de Incidente",
            NatureKey::Outro => "Outras Ocorrências",
        }
    }
}

impl fmt::Display for NatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

impl FromStr for NatureKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NatureKey::PRIORITY
            .into_iter()
            .find(|key| key.wire_key() == s)
            .ok_or_else(|| format!("unknown nature '{s}'"))
    }
}

/// The `formsFilled` flags of an occurrence.
///
/// Missing flags deserialize as `false`; unknown flags are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FormsFilled {
    pub incendio: bool,
    pub salvamento: bool,
    pub aph: bool,
    pub produtos_perigosos: bool,
    pub prevencao: bool,
    pub atividade_comunitaria: bool,
    pub gestao_incidente: bool,
    pub outro: bool,
}

impl FormsFilled {
    pub fn is_set(&self, key: NatureKey) -> bool {
        match key {
            NatureKey::Incendio => self.incendio,
            NatureKey::Salvamento => self.salvamento,
            NatureKey::Aph => self.aph,
            NatureKey::ProdutosPerigosos => self.produtos_perigosos,
            NatureKey::Prevencao => self.prevencao,
            NatureKey::AtividadeComunitaria => self.atividade_comunitaria,
            NatureKey::GestaoIncidente => self.gestao_incidente,
            NatureKey::Outro => self.outro,
        }
    }

    pub fn set(&mut self, key: NatureKey, value: bool) {
        let flag = match key {
            NatureKey::Incendio => &mut self.incendio,
            NatureKey::Salvamento => &mut self.salvamento,
            NatureKey::Aph => &mut self.aph,
            NatureKey::ProdutosPerigosos => &mut self.produtos_perigosos,
            NatureKey::Prevencao => &mut self.prevencao,
            NatureKey::AtividadeComunitaria => &mut self.atividade_comunitaria,
            NatureKey::GestaoIncidente => &mut self.gestao_incidente,
            NatureKey::Outro => &mut self.outro,
        };
        *flag = value;
    }

    /// Keys whose flag is set, in priority order.
    pub fn marked(&self) -> impl Iterator<Item = NatureKey> + '_ {
        NatureKey::PRIORITY
            .into_iter()
            .filter(move |key| self.is_set(*key))
    }
}

/// Returns the active nature: the highest-priority key whose flag is set.
///
/// `None` means a basic occurrence with no nature detail step.
pub fn resolve_active_nature(forms_filled: &FormsFilled) -> Option<NatureKey> {
    forms_filled.marked().next()
}

/// Dashboard `tipo` label for an optional nature.
pub fn tipo_label(nature: Option<NatureKey>) -> &'static str {
    nature.map_or(BASIC_OCCURRENCE_LABEL, NatureKey::display_label)
}
