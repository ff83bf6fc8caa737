//! Dashboard field derivation.
//!
//! Listing screens show a status label, a type label, a priority, a reference number and
//! the save time. These are computed from the draft on every save by [`derive_record`];
//! nothing else writes them.

use crate::constants::{DEFAULT_PRIORITY, REFERENCE_PREFIX, REFERENCE_SUFFIX_LEN};
use crate::nature::tipo_label;
use crate::occurrence::{OccurrenceDraft, OccurrenceRecord};
use crate::wizard::Mode;
use chrono::{DateTime, Datelike, Utc};
use ocorrencia_uuid::OccurrenceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Situation codes used by the basic form's `situacao` select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Situacao {
    Pendente,
    EmAndamento,
    Finalizada,
    Cancelada,
    Trote,
}

impl Situacao {
    pub fn code(self) -> &'static str {
        match self {
            Situacao::Pendente => "pendente",
            Situacao::EmAndamento => "em-andamento",
            Situacao::Finalizada => "finalizada",
            Situacao::Cancelada => "cancelada",
            Situacao::Trote => "trote",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pendente" => Some(Situacao::Pendente),
            "em-andamento" => Some(Situacao::EmAndamento),
            "finalizada" => Some(Situacao::Finalizada),
            "cancelada" => Some(Situacao::Cancelada),
            "trote" => Some(Situacao::Trote),
            _ => None,
        }
    }
}

/// Status label shown on the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusLabel {
    #[serde(rename = "Pendente")]
    Pendente,
    #[serde(rename = "Em andamento")]
    EmAndamento,
    #[serde(rename = "Concluída")]
    Concluida,
    #[serde(rename = "Cancelada")]
    Cancelada,
    #[serde(rename = "Trote")]
    Trote,
}

impl StatusLabel {
    /// Maps a situation code to its label. Unknown or empty codes map to `Pendente`.
    pub fn from_situacao(code: &str) -> Self {
        match Situacao::from_code(code) {
            Some(Situacao::Pendente) | None => StatusLabel::Pendente,
            Some(Situacao::EmAndamento) => StatusLabel::EmAndamento,
            Some(Situacao::Finalizada) => StatusLabel::Concluida,
            Some(Situacao::Cancelada) => StatusLabel::Cancelada,
            Some(Situacao::Trote) => StatusLabel::Trote,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusLabel::Pendente => "Pendente",
            StatusLabel::EmAndamento => "Em andamento",
            StatusLabel::Concluida => "Concluída",
            StatusLabel::Cancelada => "Cancelada",
            StatusLabel::Trote => "Trote",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference number for a record first saved in `year`: `OC-<year>-<last 4 id chars>`.
pub fn generate_num_aviso(year: i32, id: &OccurrenceId) -> String {
    format!(
        "{}-{}-{}",
        REFERENCE_PREFIX,
        year,
        id.upper_suffix(REFERENCE_SUFFIX_LEN)
    )
}

/// Builds the record to persist from `draft`.
///
/// Besides the dashboard fields, the returned record's draft part may differ from the
/// input:
/// - a blank `numAviso` is generated from the save year and the id;
/// - a blank `prioridade` becomes "Média";
/// - in edit mode a `pendente` situation advances to `em-andamento`.
///
/// The last rule treats re-opening a pending occurrence as the start of work on it.
pub fn derive_record(draft: &OccurrenceDraft, mode: Mode, now: DateTime<Utc>) -> OccurrenceRecord {
    let mut occurrence = draft.clone();

    if mode == Mode::Edit && occurrence.situacao == Situacao::Pendente.code() {
        tracing::debug!(id = %occurrence.id, "advancing pending occurrence to em-andamento");
        occurrence.situacao = Situacao::EmAndamento.code().to_string();
    }

    if occurrence.num_aviso.trim().is_empty() {
        occurrence.num_aviso = generate_num_aviso(now.year(), &occurrence.id);
    }

    if occurrence.prioridade.trim().is_empty() {
        occurrence.prioridade = DEFAULT_PRIORITY.to_string();
    }

    let status = StatusLabel::from_situacao(&occurrence.situacao);
    let tipo = tipo_label(occurrence.active_nature()).to_string();

    OccurrenceRecord {
        occurrence,
        status,
        tipo,
        data: now,
        extra: serde_json::Map::new(),
    }
}
