//! Occurrence record model.
//!
//! [`OccurrenceDraft`] is the record being edited; [`OccurrenceRecord`] is the persisted
//! form with the dashboard fields derived at save time. Both serialize to the flat JSON
//! shape the forms address with dotted paths:
//!
//! ```text
//! {
//!   "id": "…", "numAviso": "OC-2025-AB12", "viatura": "ABT-12",
//!   "endereco": { "rua": "…", "bairro": "…", "latitude": -8.05, … },
//!   "situacao": "pendente", "prioridade": "Alta",
//!   "vitimas": { "feridos": 2 }, "guarnicao": ["…"],
//!   "formsFilled": { "incendio": true, … },
//!   "incendio": { "areaAtingida": "…" },
//!   "status": "Pendente", "tipo": "Incêndio", "data": "2025-03-01T12:00:00Z"
//! }
//! ```
//!
//! The draft schema is strict: unknown keys are rejected when a change is merged. Stored
//! records may still carry keys this version does not know (payloads written by older
//! apps); those are kept in [`OccurrenceRecord::extra`] and written back unchanged.

use crate::dashboard::StatusLabel;
use crate::nature::{resolve_active_nature, FormsFilled, NatureKey};
use chrono::{DateTime, Utc};
use ocorrencia_types::NonEmptyText;
use ocorrencia_uuid::OccurrenceId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Situation code given to brand-new drafts.
pub const INITIAL_SITUACAO: &str = "pendente";

// ============================================================================
// Basic form
// ============================================================================

/// Address block of the basic form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Endereco {
    pub rua: String,
    pub numero: String,
    pub bairro: String,
    pub municipio: String,
    pub ponto_referencia: String,
    #[serde(
        deserialize_with = "lenient::optional_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,
    #[serde(
        deserialize_with = "lenient::optional_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,
}

/// Victim counts of the basic form. A blank input clears a count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Vitimas {
    #[serde(
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub ilesos: Option<u32>,
    #[serde(
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub feridos: Option<u32>,
    #[serde(
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub obitos: Option<u32>,
    #[serde(
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub desaparecidos: Option<u32>,
}

impl Vitimas {
    pub fn total(&self) -> u32 {
        [self.ilesos, self.feridos, self.obitos, self.desaparecidos]
            .into_iter()
            .flatten()
            .sum()
    }
}

// ============================================================================
// Nature forms
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FireDetails {
    pub tipo_incendio: String,
    pub tipo_edificacao: String,
    pub area_atingida: String,
    pub material_combustivel: String,
    pub agente_extintor: String,
    pub agua_utilizada_litros: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RescueDetails {
    pub tipo_salvamento: String,
    pub ambiente: String,
    pub equipamentos: String,
    pub vitimas_resgatadas: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PreHospitalDetails {
    pub tipo_atendimento: String,
    pub nivel_consciencia: String,
    pub sinais_vitais: String,
    pub procedimentos: String,
    pub unidade_destino: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HazmatDetails {
    pub produto: String,
    pub numero_onu: String,
    pub classe_risco: String,
    pub quantidade: String,
    pub medidas_adotadas: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PreventionDetails {
    pub tipo_atividade: String,
    pub evento: String,
    pub publico_estimado: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CommunityActivityDetails {
    pub tipo_atividade: String,
    pub instituicao: String,
    pub participantes: String,
}

/// Incident-management briefing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct IncidentManagementDetails {
    pub comandante: String,
    pub posto_comando: String,
    pub objetivos: String,
    pub recursos_empregados: String,
    pub proxima_reuniao: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct OtherDetails {
    pub descricao: String,
}

/// Nature-specific detail, tagged by nature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NatureDetails {
    Incendio(FireDetails),
    Salvamento(RescueDetails),
    Aph(PreHospitalDetails),
    ProdutosPerigosos(HazmatDetails),
    Prevencao(PreventionDetails),
    AtividadeComunitaria(CommunityActivityDetails),
    GestaoIncidente(IncidentManagementDetails),
    Outro(OtherDetails),
}

impl NatureDetails {
    pub fn key(&self) -> NatureKey {
        match self {
            NatureDetails::Incendio(_) => NatureKey::Incendio,
            NatureDetails::Salvamento(_) => NatureKey::Salvamento,
            NatureDetails::Aph(_) => NatureKey::Aph,
            NatureDetails::ProdutosPerigosos(_) => NatureKey::ProdutosPerigosos,
            NatureDetails::Prevencao(_) => NatureKey::Prevencao,
            NatureDetails::AtividadeComunitaria(_) => NatureKey::AtividadeComunitaria,
            NatureDetails::GestaoIncidente(_) => NatureKey::GestaoIncidente,
            NatureDetails::Outro(_) => NatureKey::Outro,
        }
    }

    /// Empty detail object for `key`.
    pub fn empty(key: NatureKey) -> Self {
        match key {
            NatureKey::Incendio => NatureDetails::Incendio(Default::default()),
            NatureKey::Salvamento => NatureDetails::Salvamento(Default::default()),
            NatureKey::Aph => NatureDetails::Aph(Default::default()),
            NatureKey::ProdutosPerigosos => NatureDetails::ProdutosPerigosos(Default::default()),
            NatureKey::Prevencao => NatureDetails::Prevencao(Default::default()),
            NatureKey::AtividadeComunitaria => {
                NatureDetails::AtividadeComunitaria(Default::default())
            }
            NatureKey::GestaoIncidente => NatureDetails::GestaoIncidente(Default::default()),
            NatureKey::Outro => NatureDetails::Outro(Default::default()),
        }
    }
}

// ============================================================================
// Draft
// ============================================================================

/// The occurrence being edited.
///
/// `id` is assigned by [`OccurrenceDraft::new`] and never changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OccurrenceDraft {
    pub id: OccurrenceId,

    #[serde(default)]
    pub num_aviso: String,
    #[serde(default)]
    pub viatura: String,
    #[serde(default)]
    pub data_hora_acionamento: String,
    #[serde(default)]
    pub endereco: Endereco,
    #[serde(default)]
    pub prioridade: String,
    #[serde(default)]
    pub situacao: String,
    #[serde(default)]
    pub vitimas: Vitimas,
    #[serde(default)]
    pub guarnicao: Vec<String>,
    #[serde(default)]
    pub historico: String,
    #[serde(default)]
    pub foto_ocorrencia: String,
    #[serde(default)]
    pub assinatura_digital: String,

    #[serde(default)]
    pub forms_filled: FormsFilled,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incendio: Option<FireDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salvamento: Option<RescueDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aph: Option<PreHospitalDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produtos_perigosos: Option<HazmatDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevencao: Option<PreventionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atividade_comunitaria: Option<CommunityActivityDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gestao_incidente: Option<IncidentManagementDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<OtherDetails>,
}

impl Default for OccurrenceDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl OccurrenceDraft {
    /// Fresh draft: new id, pending situation, no nature marked.
    pub fn new() -> Self {
        Self::with_id(OccurrenceId::new())
    }

    pub fn with_id(id: OccurrenceId) -> Self {
        Self {
            id,
            num_aviso: String::new(),
            viatura: String::new(),
            data_hora_acionamento: String::new(),
            endereco: Endereco::default(),
            prioridade: String::new(),
            situacao: INITIAL_SITUACAO.to_string(),
            vitimas: Vitimas::default(),
            guarnicao: Vec::new(),
            historico: String::new(),
            foto_ocorrencia: String::new(),
            assinatura_digital: String::new(),
            forms_filled: FormsFilled::default(),
            incendio: None,
            salvamento: None,
            aph: None,
            produtos_perigosos: None,
            prevencao: None,
            atividade_comunitaria: None,
            gestao_incidente: None,
            outro: None,
        }
    }

    pub fn active_nature(&self) -> Option<NatureKey> {
        resolve_active_nature(&self.forms_filled)
    }

    /// Detail object stored for `key`, if any.
    pub fn nature_details(&self, key: NatureKey) -> Option<NatureDetails> {
        match key {
            NatureKey::Incendio => self.incendio.clone().map(NatureDetails::Incendio),
            NatureKey::Salvamento => self.salvamento.clone().map(NatureDetails::Salvamento),
            NatureKey::Aph => self.aph.clone().map(NatureDetails::Aph),
            NatureKey::ProdutosPerigosos => self
                .produtos_perigosos
                .clone()
                .map(NatureDetails::ProdutosPerigosos),
            NatureKey::Prevencao => self.prevencao.clone().map(NatureDetails::Prevencao),
            NatureKey::AtividadeComunitaria => self
                .atividade_comunitaria
                .clone()
                .map(NatureDetails::AtividadeComunitaria),
            NatureKey::GestaoIncidente => self
                .gestao_incidente
                .clone()
                .map(NatureDetails::GestaoIncidente),
            NatureKey::Outro => self.outro.clone().map(NatureDetails::Outro),
        }
    }

    /// Detail object of the active nature, if one is active and filled.
    pub fn active_details(&self) -> Option<NatureDetails> {
        self.active_nature()
            .and_then(|key| self.nature_details(key))
    }

    /// Stores `details` under its nature key, replacing what was there.
    pub fn set_nature_details(&mut self, details: NatureDetails) {
        match details {
            NatureDetails::Incendio(d) => self.incendio = Some(d),
            NatureDetails::Salvamento(d) => self.salvamento = Some(d),
            NatureDetails::Aph(d) => self.aph = Some(d),
            NatureDetails::ProdutosPerigosos(d) => self.produtos_perigosos = Some(d),
            NatureDetails::Prevencao(d) => self.prevencao = Some(d),
            NatureDetails::AtividadeComunitaria(d) => self.atividade_comunitaria = Some(d),
            NatureDetails::GestaoIncidente(d) => self.gestao_incidente = Some(d),
            NatureDetails::Outro(d) => self.outro = Some(d),
        }
    }

    /// The first non-blank location identifier: street, then neighbourhood, then
    /// reference point.
    pub fn location_identifier(&self) -> Option<NonEmptyText> {
        [
            &self.endereco.rua,
            &self.endereco.bairro,
            &self.endereco.ponto_referencia,
        ]
        .into_iter()
        .find_map(NonEmptyText::from_optional)
    }
}

// ============================================================================
// Persisted record
// ============================================================================

/// A saved occurrence with its dashboard fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    #[serde(flatten)]
    pub occurrence: OccurrenceDraft,

    pub status: StatusLabel,
    pub tipo: String,
    /// Time of the last save, not the time of the event.
    pub data: DateTime<Utc>,

    /// Stored keys outside the record schema. Must stay the last flattened field so it
    /// only collects what the draft did not claim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OccurrenceRecord {
    pub fn id(&self) -> &OccurrenceId {
        &self.occurrence.id
    }
}

mod lenient {
    //! Deserializers for numeric inputs that the UI may send as text.

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| D::Error::custom("count must be a non-negative integer")),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<u32>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("'{s}' is not a valid count"))),
            other => Err(D::Error::custom(format!("unexpected count value: {other}"))),
        }
    }

    pub(super) fn optional_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("coordinate out of range")),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            // Decimal comma is common in pt-BR input.
            Value::String(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("'{s}' is not a valid coordinate"))),
            other => Err(D::Error::custom(format!(
                "unexpected coordinate value: {other}"
            ))),
        }
    }
}
