//! Two-step occurrence wizard.
//!
//! The wizard owns one in-memory draft and walks it through two steps:
//!
//! 1. [`Step::Basic`]: address, vehicle, victims, crew and the nature flags. Submitting
//!    saves a draft record; if a nature is marked, the wizard advances to step 2.
//! 2. [`Step::Nature`]: the detail form of the active nature. Submitting saves the
//!    final record and hands control back to the listing.
//!
//! Every save goes through [`derive_record`] and [`RecordStore::upsert`]. Platform
//! concerns (notices, confirmation dialogs, navigation) are delegated to a
//! [`WizardHost`].
//!
//! ```text
//!            submit (nature marked)
//!   Basic ─────────────────────────▶ Nature(n) ──submit──▶ finished
//!     ▲  ╲                              │
//!     │   ╲ cancel + confirm            │ cancel
//!     │    ╲──────────────▶ finished    │
//!     └─────────────────────────────────┘
//! ```

use crate::capture::{
    ensure_image_data_url, CaptureError, CaptureKind, LocationCapture, PhotoCapture,
    SignatureCapture, LATITUDE_PATH, LONGITUDE_PATH, PHOTO_PATH, SIGNATURE_PATH,
};
use crate::constants::{SUBMIT_LABEL_FINISH, SUBMIT_LABEL_NEXT, SUBMIT_LABEL_SAVE};
use crate::dashboard::derive_record;
use crate::field_path::{root_segment, set_path, FieldInput};
use crate::nature::NatureKey;
use crate::occurrence::{NatureDetails, OccurrenceDraft, OccurrenceRecord};
use crate::store::{RecordStore, StorageBackend};
use crate::validation::{validate_basic, ValidationError};
use crate::{OccurrenceError, OccurrenceResult};
use chrono::{DateTime, Utc};
use ocorrencia_uuid::OccurrenceId;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Whether the wizard started from a fresh draft or an existing record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Basic,
    Nature(NatureKey),
}

/// Form a renderer should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormKind {
    Basic,
    Nature(NatureKey),
}

impl From<Step> for FormKind {
    fn from(step: Step) -> Self {
        match step {
            Step::Basic => FormKind::Basic,
            Step::Nature(key) => FormKind::Nature(key),
        }
    }
}

/// User-facing notices raised by the wizard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    RecordNotFound { id: String },
    StoreUnavailable { message: String },
    ValidationFailed(ValidationError),
    SaveFailed { message: String },
    CaptureFailed { kind: CaptureKind, error: CaptureError },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::RecordNotFound { id } => {
                write!(f, "Ocorrência {id} não encontrada. Iniciando uma nova.")
            }
            Notice::StoreUnavailable { message } => write!(
                f,
                "Não foi possível ler as ocorrências salvas ({message}). Iniciando uma nova."
            ),
            Notice::ValidationFailed(err) => write!(f, "Verifique o formulário: {err}."),
            Notice::SaveFailed { message } => write!(f, "Falha ao salvar localmente: {message}"),
            Notice::CaptureFailed { kind, error } => {
                write!(f, "Não foi possível capturar {kind}: {error}")
            }
        }
    }
}

/// Platform side of the wizard.
pub trait WizardHost {
    fn notify(&mut self, notice: Notice);

    /// Asks the user whether to discard the current draft.
    fn confirm_cancel(&mut self) -> bool;

    fn navigate_to_listing(&mut self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Step 1 validation failed; nothing was saved.
    Invalid(ValidationError),
    /// The store rejected the write; draft and step are unchanged.
    SaveFailed,
    /// Step 1 saved with no nature marked; the wizard stays on step 1.
    SavedDraft,
    /// Step 1 saved and the wizard moved to the nature's detail form.
    AdvancedToNature(NatureKey),
    /// Step 2 saved; the wizard is finished.
    Finalized(OccurrenceId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    ReturnedToBasic,
    Discarded,
    Kept,
}

/// Read-only view handed to form renderers.
#[derive(Clone, Copy, Debug)]
pub struct WizardView<'a> {
    pub draft: &'a OccurrenceDraft,
    pub form: FormKind,
    pub submit_label: &'static str,
}

pub struct Wizard<B, H> {
    store: Arc<RecordStore<B>>,
    host: H,
    clock: fn() -> DateTime<Utc>,
    draft: OccurrenceDraft,
    mode: Mode,
    step: Step,
    selected_nature: Option<NatureKey>,
    last_saved: Option<OccurrenceRecord>,
    finished: bool,
}

impl<B: StorageBackend, H: WizardHost> Wizard<B, H> {
    /// Starts a new occurrence.
    pub fn create(store: Arc<RecordStore<B>>, host: H) -> Self {
        let draft = OccurrenceDraft::new();
        tracing::debug!(id = %draft.id, "starting new occurrence");
        Self::start(store, host, draft, Mode::Create)
    }

    /// Re-opens the stored occurrence `id` on step 1 with its nature pre-selected.
    ///
    /// A missing record, or a store that cannot be read, falls back to a fresh draft in
    /// create mode after notifying the host.
    pub fn edit(store: Arc<RecordStore<B>>, mut host: H, id: &OccurrenceId) -> Self {
        match store.find_by_id(id) {
            Ok(Some(record)) => {
                tracing::info!(%id, "editing occurrence");
                Self::start(store, host, record.occurrence, Mode::Edit)
            }
            Ok(None) => {
                tracing::warn!(%id, "occurrence not found, starting a new one");
                host.notify(Notice::RecordNotFound { id: id.to_string() });
                Self::create(store, host)
            }
            Err(e) => {
                tracing::error!(%id, error = %e, "failed to load occurrence");
                host.notify(Notice::StoreUnavailable {
                    message: e.to_string(),
                });
                Self::create(store, host)
            }
        }
    }

    fn start(store: Arc<RecordStore<B>>, host: H, draft: OccurrenceDraft, mode: Mode) -> Self {
        let selected_nature = draft.active_nature();
        Self {
            store,
            host,
            clock: Utc::now,
            draft,
            mode,
            step: Step::Basic,
            selected_nature,
            last_saved: None,
            finished: false,
        }
    }

    /// Replaces the clock used for the save timestamp and the reference-number year.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn draft(&self) -> &OccurrenceDraft {
        &self.draft
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Nature resolved from the draft's current flags.
    pub fn selected_nature(&self) -> Option<NatureKey> {
        self.selected_nature
    }

    /// Record written by the most recent successful save.
    pub fn last_saved(&self) -> Option<&OccurrenceRecord> {
        self.last_saved.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn view(&self) -> WizardView<'_> {
        let submit_label = match (self.step, self.selected_nature) {
            (Step::Nature(_), _) => SUBMIT_LABEL_FINISH,
            (Step::Basic, Some(_)) => SUBMIT_LABEL_NEXT,
            (Step::Basic, None) => SUBMIT_LABEL_SAVE,
        };
        WizardView {
            draft: &self.draft,
            form: self.step.into(),
            submit_label,
        }
    }

    /// Sets the field at `path` from a form input.
    ///
    /// An empty path is a no-op.
    ///
    /// # Errors
    ///
    /// - [`OccurrenceError::ImmutableField`] if the path addresses `id`.
    /// - [`OccurrenceError::InvalidField`] if the result does not fit the draft schema.
    /// - [`OccurrenceError::WizardFinished`] after the wizard finished.
    ///
    /// On error the draft is unchanged.
    pub fn set_field(&mut self, path: &str, input: impl Into<FieldInput>) -> OccurrenceResult<()> {
        self.ensure_active()?;
        if path.is_empty() {
            return Ok(());
        }
        self.apply_changes(vec![(path, input.into().into_value())])
    }

    /// Replaces the detail object of one nature.
    pub fn set_nature_details(&mut self, details: NatureDetails) -> OccurrenceResult<()> {
        self.ensure_active()?;
        self.draft.set_nature_details(details);
        Ok(())
    }

    fn apply_changes(&mut self, changes: Vec<(&str, Value)>) -> OccurrenceResult<()> {
        if let Some((path, _)) = changes.iter().find(|(p, _)| root_segment(p) == "id") {
            tracing::warn!(path, "rejected change to occurrence id");
            return Err(OccurrenceError::ImmutableField((*path).to_string()));
        }

        let mut tree = serde_json::to_value(&self.draft).map_err(OccurrenceError::Serialization)?;
        let paths: Vec<String> = changes.iter().map(|(p, _)| (*p).to_string()).collect();
        for (path, value) in changes {
            tree = set_path(tree, path, value).map_err(|e| OccurrenceError::InvalidField {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        }

        let draft: OccurrenceDraft =
            serde_path_to_error::deserialize(tree).map_err(|e| OccurrenceError::InvalidField {
                path: paths.join(", "),
                reason: e.to_string(),
            })?;

        self.draft = draft;
        self.selected_nature = self.draft.active_nature();
        tracing::trace!(paths = ?paths, "draft updated");
        Ok(())
    }

    /// Submits the current step.
    ///
    /// Validation and save failures are reported to the host and returned as outcomes;
    /// the only error is calling this on a finished wizard.
    pub fn submit(&mut self) -> OccurrenceResult<SubmitOutcome> {
        self.ensure_active()?;
        match self.step {
            Step::Basic => Ok(self.submit_basic()),
            Step::Nature(key) => Ok(self.submit_nature(key)),
        }
    }

    fn submit_basic(&mut self) -> SubmitOutcome {
        // Edits skip validation so older records with incomplete addresses stay editable.
        if self.mode == Mode::Create {
            if let Err(err) = validate_basic(&self.draft) {
                tracing::info!(id = %self.draft.id, error = %err, "basic form rejected");
                self.host.notify(Notice::ValidationFailed(err.clone()));
                return SubmitOutcome::Invalid(err);
            }
        }

        if !self.save() {
            return SubmitOutcome::SaveFailed;
        }

        self.selected_nature = self.draft.active_nature();
        match self.selected_nature {
            Some(key) => {
                tracing::debug!(id = %self.draft.id, nature = %key, "advancing to nature form");
                self.step = Step::Nature(key);
                SubmitOutcome::AdvancedToNature(key)
            }
            None => SubmitOutcome::SavedDraft,
        }
    }

    fn submit_nature(&mut self, key: NatureKey) -> SubmitOutcome {
        if !self.save() {
            return SubmitOutcome::SaveFailed;
        }

        let id = self.draft.id.clone();
        tracing::info!(%id, nature = %key, "occurrence finalized");
        self.finish();
        SubmitOutcome::Finalized(id)
    }

    /// Derives the record, upserts it and commits the saved draft. Returns `false` on a
    /// store failure, leaving the draft untouched.
    fn save(&mut self) -> bool {
        let record = derive_record(&self.draft, self.mode, (self.clock)());
        match self.store.upsert(record.clone()) {
            Ok(change) => {
                tracing::debug!(id = %record.id(), ?change, status = %record.status, "occurrence saved");
                self.draft = record.occurrence.clone();
                self.last_saved = Some(record);
                true
            }
            Err(e) => {
                tracing::error!(id = %self.draft.id, error = %e, "failed to save occurrence");
                self.host.notify(Notice::SaveFailed {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Cancels the current step.
    ///
    /// On step 2 this returns to step 1 keeping the draft. On step 1 the host is asked
    /// to confirm; a confirmed cancel discards the draft without saving.
    pub fn cancel(&mut self) -> OccurrenceResult<CancelOutcome> {
        self.ensure_active()?;
        match self.step {
            Step::Nature(_) => {
                self.step = Step::Basic;
                Ok(CancelOutcome::ReturnedToBasic)
            }
            Step::Basic => {
                if self.host.confirm_cancel() {
                    tracing::info!(id = %self.draft.id, "draft discarded");
                    self.finish();
                    Ok(CancelOutcome::Discarded)
                } else {
                    Ok(CancelOutcome::Kept)
                }
            }
        }
    }

    fn finish(&mut self) {
        self.draft = OccurrenceDraft::new();
        self.selected_nature = None;
        self.step = Step::Basic;
        self.finished = true;
        self.host.navigate_to_listing();
    }

    /// Fills `endereco.latitude`/`endereco.longitude` from a location widget.
    ///
    /// Returns whether a value was merged.
    pub fn capture_location(
        &mut self,
        widget: &mut dyn LocationCapture,
    ) -> OccurrenceResult<bool> {
        self.ensure_active()?;
        match widget.capture_location() {
            Ok(Some(coords)) => {
                self.apply_changes(vec![
                    (LATITUDE_PATH, FieldInput::Number(coords.latitude).into_value()),
                    (LONGITUDE_PATH, FieldInput::Number(coords.longitude).into_value()),
                ])?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => Ok(self.capture_failed(CaptureKind::Location, error)),
        }
    }

    /// Stores a photo reference in `fotoOcorrencia`.
    pub fn capture_photo(&mut self, widget: &mut dyn PhotoCapture) -> OccurrenceResult<bool> {
        self.ensure_active()?;
        match widget.capture_photo() {
            Ok(Some(reference)) => {
                self.apply_changes(vec![(PHOTO_PATH, Value::String(reference))])?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => Ok(self.capture_failed(CaptureKind::Photo, error)),
        }
    }

    /// Stores a signature data URL in `assinaturaDigital`.
    pub fn capture_signature(
        &mut self,
        widget: &mut dyn SignatureCapture,
    ) -> OccurrenceResult<bool> {
        self.ensure_active()?;
        let captured = widget
            .capture_signature()
            .and_then(|sig| match sig {
                Some(url) => ensure_image_data_url(&url).map(|()| Some(url)),
                None => Ok(None),
            });
        match captured {
            Ok(Some(url)) => {
                self.apply_changes(vec![(SIGNATURE_PATH, Value::String(url))])?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => Ok(self.capture_failed(CaptureKind::Signature, error)),
        }
    }

    fn capture_failed(&mut self, kind: CaptureKind, error: CaptureError) -> bool {
        tracing::warn!(%kind, error = %error, "capture failed");
        self.host.notify(Notice::CaptureFailed { kind, error });
        false
    }

    fn ensure_active(&self) -> OccurrenceResult<()> {
        if self.finished {
            return Err(OccurrenceError::WizardFinished);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Coordinates;
    use crate::dashboard::StatusLabel;
    use crate::occurrence::FireDetails;
    use crate::store::MemoryBackend;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    const KEY: &str = "test:ocorrencias";

    #[derive(Default)]
    struct RecordingHost {
        notices: Vec<Notice>,
        navigations: usize,
        confirm: bool,
        confirm_asked: usize,
    }

    impl WizardHost for RecordingHost {
        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }

        fn confirm_cancel(&mut self) -> bool {
            self.confirm_asked += 1;
            self.confirm
        }

        fn navigate_to_listing(&mut self) {
            self.navigations += 1;
        }
    }

    struct RejectingBackend;

    impl StorageBackend for RejectingBackend {
        fn read(&self, _key: &str) -> OccurrenceResult<Option<String>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> OccurrenceResult<()> {
            Err(OccurrenceError::FileWrite(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    /// Memory store whose writes can be switched off mid-test.
    struct ToggleBackend {
        inner: MemoryBackend,
        fail_writes: AtomicBool,
    }

    impl ToggleBackend {
        fn new() -> Self {
            Self {
                inner: MemoryBackend::new(),
                fail_writes: AtomicBool::new(false),
            }
        }
    }

    impl StorageBackend for ToggleBackend {
        fn read(&self, key: &str) -> OccurrenceResult<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> OccurrenceResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(OccurrenceError::FileWrite(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.write(key, value)
        }
    }

    struct Fixed<T>(Result<Option<T>, CaptureError>);

    impl LocationCapture for Fixed<Coordinates> {
        fn capture_location(&mut self) -> Result<Option<Coordinates>, CaptureError> {
            self.0.clone()
        }
    }

    impl PhotoCapture for Fixed<String> {
        fn capture_photo(&mut self) -> Result<Option<String>, CaptureError> {
            self.0.clone()
        }
    }

    impl SignatureCapture for Fixed<String> {
        fn capture_signature(&mut self) -> Result<Option<String>, CaptureError> {
            self.0.clone()
        }
    }

    fn at_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn memory_store() -> Arc<RecordStore<MemoryBackend>> {
        Arc::new(RecordStore::new(MemoryBackend::new(), KEY))
    }

    fn new_wizard(
        store: &Arc<RecordStore<MemoryBackend>>,
    ) -> Wizard<MemoryBackend, RecordingHost> {
        Wizard::create(Arc::clone(store), RecordingHost::default()).with_clock(at_2025)
    }

    #[test]
    fn test_basic_occurrence_saves_and_stays_on_step_one() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();

        assert_eq!(wizard.view().submit_label, "Salvar");
        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::SavedDraft);
        assert_eq!(wizard.step(), Step::Basic);

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.tipo, "Ocorrência Básica");
        assert_eq!(record.status, StatusLabel::Pendente);
        assert_eq!(record.occurrence.prioridade, "Média");
        assert_eq!(record.data, at_2025());
        assert_eq!(
            record.occurrence.num_aviso,
            format!("OC-2025-{}", wizard.draft().id.upper_suffix(4))
        );
        assert_eq!(wizard.draft(), &record.occurrence);
        assert_eq!(wizard.host().navigations, 0);
    }

    #[test]
    fn test_fire_occurrence_goes_through_both_steps() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.rua", "Rua da Aurora").unwrap();
        wizard.set_field("formsFilled.incendio", true).unwrap();
        assert_eq!(wizard.view().submit_label, "Próximo");

        assert_eq!(
            wizard.submit().unwrap(),
            SubmitOutcome::AdvancedToNature(NatureKey::Incendio)
        );
        assert_eq!(wizard.view().form, FormKind::Nature(NatureKey::Incendio));
        assert_eq!(wizard.view().submit_label, "Finalizar");
        let id = wizard.draft().id.clone();
        assert_eq!(store.find_by_id(&id).unwrap().unwrap().tipo, "Incêndio");

        wizard.set_field("incendio.areaAtingida", "200 m2").unwrap();
        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::Finalized(id.clone()));

        let saved = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(saved.tipo, "Incêndio");
        assert_eq!(
            saved.occurrence.incendio,
            Some(FireDetails {
                area_atingida: "200 m2".into(),
                ..Default::default()
            })
        );
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(wizard.host().navigations, 1);
        assert!(wizard.is_finished());
        assert_ne!(wizard.draft().id, id);
    }

    #[test]
    fn test_missing_location_blocks_create() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("viatura", "ABT-12").unwrap();

        assert_eq!(
            wizard.submit().unwrap(),
            SubmitOutcome::Invalid(ValidationError::MissingLocation)
        );
        assert_eq!(wizard.step(), Step::Basic);
        assert!(store.list().unwrap().is_empty());
        assert_eq!(
            wizard.host().notices,
            vec![Notice::ValidationFailed(ValidationError::MissingLocation)]
        );
    }

    #[test]
    fn test_blank_location_counts_as_missing() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.rua", "   ").unwrap();
        assert!(matches!(wizard.submit().unwrap(), SubmitOutcome::Invalid(_)));
    }

    #[test]
    fn test_edit_advances_pending_and_skips_validation() {
        let store = memory_store();
        let mut first = new_wizard(&store);
        first.set_field("endereco.bairro", "Boa Viagem").unwrap();
        first.submit().unwrap();
        let id = first.draft().id.clone();

        let mut wizard =
            Wizard::edit(Arc::clone(&store), RecordingHost::default(), &id).with_clock(at_2025);
        assert_eq!(wizard.mode(), Mode::Edit);
        assert_eq!(wizard.step(), Step::Basic);
        // Edits are not validated, even with the address cleared.
        wizard.set_field("endereco.bairro", "").unwrap();

        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::SavedDraft);
        let saved = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(saved.occurrence.situacao, "em-andamento");
        assert_eq!(saved.status, StatusLabel::EmAndamento);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_edit_preselects_nature_on_step_one() {
        let store = memory_store();
        let mut first = new_wizard(&store);
        first.set_field("endereco.bairro", "Pina").unwrap();
        first.set_field("formsFilled.salvamento", true).unwrap();
        first.submit().unwrap();
        let id = first.draft().id.clone();

        let wizard = Wizard::edit(Arc::clone(&store), RecordingHost::default(), &id);
        assert_eq!(wizard.step(), Step::Basic);
        assert_eq!(wizard.selected_nature(), Some(NatureKey::Salvamento));
        assert_eq!(wizard.view().submit_label, "Próximo");
    }

    #[test]
    fn test_edit_unknown_id_falls_back_to_create() {
        let store = memory_store();
        let missing = OccurrenceId::new();
        let wizard = Wizard::edit(Arc::clone(&store), RecordingHost::default(), &missing);

        assert_eq!(wizard.mode(), Mode::Create);
        assert_ne!(wizard.draft().id, missing);
        assert_eq!(
            wizard.host().notices,
            vec![Notice::RecordNotFound {
                id: missing.to_string()
            }]
        );
    }

    #[test]
    fn test_edit_with_corrupt_store_falls_back_to_create() {
        let backend = MemoryBackend::new();
        backend.insert_raw(KEY, "{not json");
        let store = Arc::new(RecordStore::new(backend, KEY));

        let wizard = Wizard::edit(store, RecordingHost::default(), &OccurrenceId::new());
        assert_eq!(wizard.mode(), Mode::Create);
        assert!(matches!(
            wizard.host().notices.as_slice(),
            [Notice::StoreUnavailable { .. }]
        ));
    }

    #[test]
    fn test_cancel_on_nature_step_returns_to_basic() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();
        wizard.set_field("formsFilled.aph", true).unwrap();
        wizard.submit().unwrap();
        wizard.set_field("aph.procedimentos", "imobilização").unwrap();
        let before = wizard.draft().clone();

        assert_eq!(wizard.cancel().unwrap(), CancelOutcome::ReturnedToBasic);
        assert_eq!(wizard.step(), Step::Basic);
        assert_eq!(wizard.draft(), &before);
        assert_eq!(wizard.host().confirm_asked, 0);
        // Only the step-one save reached the store.
        let stored = store.find_by_id(&before.id).unwrap().unwrap();
        assert_eq!(stored.occurrence.aph, None);
    }

    #[test]
    fn test_cancel_on_basic_step_asks_for_confirmation() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();

        assert_eq!(wizard.cancel().unwrap(), CancelOutcome::Kept);
        assert!(!wizard.is_finished());
        assert_eq!(wizard.draft().endereco.bairro, "Boa Viagem");

        wizard.host_mut().confirm = true;
        assert_eq!(wizard.cancel().unwrap(), CancelOutcome::Discarded);
        assert!(wizard.is_finished());
        assert_eq!(wizard.host().navigations, 1);
        assert_eq!(wizard.host().confirm_asked, 2);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_finished_wizard_rejects_operations() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.host_mut().confirm = true;
        wizard.cancel().unwrap();

        assert!(matches!(
            wizard.submit(),
            Err(OccurrenceError::WizardFinished)
        ));
        assert!(matches!(
            wizard.set_field("viatura", "ABT-12"),
            Err(OccurrenceError::WizardFinished)
        ));
        assert!(matches!(
            wizard.cancel(),
            Err(OccurrenceError::WizardFinished)
        ));
        assert_eq!(wizard.host().navigations, 1);
    }

    #[test]
    fn test_save_failure_keeps_draft_and_step() {
        let store = Arc::new(RecordStore::new(RejectingBackend, KEY));
        let mut wizard =
            Wizard::create(store, RecordingHost::default()).with_clock(at_2025);
        wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();
        wizard.set_field("formsFilled.incendio", true).unwrap();
        let before = wizard.draft().clone();

        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::SaveFailed);
        assert_eq!(wizard.step(), Step::Basic);
        assert_eq!(wizard.draft(), &before);
        assert!(wizard.last_saved().is_none());
        assert!(matches!(
            wizard.host().notices.as_slice(),
            [Notice::SaveFailed { .. }]
        ));
    }

    #[test]
    fn test_set_field_rejects_id_changes() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        let id = wizard.draft().id.clone();

        assert!(matches!(
            wizard.set_field("id", "other"),
            Err(OccurrenceError::ImmutableField(_))
        ));
        assert_eq!(wizard.draft().id, id);
    }

    #[test]
    fn test_set_field_rejects_unknown_or_ill_typed_paths() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("historico", "chegada às 10h").unwrap();
        let before = wizard.draft().clone();

        for (path, input) in [
            ("viaturaa", FieldInput::from("typo")),
            ("historico.resumo", FieldInput::from("x")),
            ("vitimas.feridos", FieldInput::from("dois")),
            ("formsFilled.bombeiro", FieldInput::from(true)),
        ] {
            let err = wizard.set_field(path, input).unwrap_err();
            assert!(
                matches!(err, OccurrenceError::InvalidField { .. }),
                "{path}: {err}"
            );
            assert_eq!(wizard.draft(), &before, "{path}");
        }
    }

    #[test]
    fn test_set_field_updates_nested_values_and_nature() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);

        wizard.set_field("", "ignored").unwrap();
        wizard.set_field("vitimas.feridos", "2").unwrap();
        wizard.set_field("guarnicao.0", "Sgt Lima").unwrap();
        wizard.set_field("guarnicao.1", "Cb Souza").unwrap();
        wizard.set_field("formsFilled.outro", true).unwrap();
        wizard.set_field("formsFilled.salvamento", true).unwrap();

        assert_eq!(wizard.draft().vitimas.feridos, Some(2));
        assert_eq!(wizard.draft().guarnicao, vec!["Sgt Lima", "Cb Souza"]);
        assert_eq!(wizard.selected_nature(), Some(NatureKey::Salvamento));

        wizard.set_field("formsFilled.salvamento", false).unwrap();
        assert_eq!(wizard.selected_nature(), Some(NatureKey::Outro));
    }

    #[test]
    fn test_existing_reference_number_is_kept() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("numAviso", "AV-2231").unwrap();
        wizard.set_field("endereco.pontoReferencia", "Praça").unwrap();
        wizard.submit().unwrap();

        assert_eq!(
            wizard.last_saved().unwrap().occurrence.num_aviso,
            "AV-2231"
        );
    }

    #[test]
    fn test_subscribers_see_each_save() {
        use std::sync::atomic::AtomicUsize;

        let store = memory_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();
        wizard.set_field("formsFilled.prevencao", true).unwrap();
        wizard.submit().unwrap();
        wizard.submit().unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture_merges_into_draft() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);

        let mut gps = Fixed(Ok(Some(Coordinates::new(-8.05, -34.9).unwrap())));
        assert!(wizard.capture_location(&mut gps).unwrap());
        assert_eq!(wizard.draft().endereco.latitude, Some(-8.05));
        assert_eq!(wizard.draft().endereco.longitude, Some(-34.9));

        let mut camera = Fixed(Ok(Some("fotos/ocorrencia-1.jpg".to_string())));
        assert!(wizard.capture_photo(&mut camera).unwrap());
        assert_eq!(wizard.draft().foto_ocorrencia, "fotos/ocorrencia-1.jpg");

        let mut pad = Fixed(Ok(Some("data:image/png;base64,iVBORw0KGgo=".to_string())));
        assert!(wizard.capture_signature(&mut pad).unwrap());
        assert!(wizard.draft().assinatura_digital.starts_with("data:image/png"));
        assert!(wizard.host().notices.is_empty());
    }

    #[test]
    fn test_dismissed_or_failed_capture_leaves_field_unset() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);

        let mut dismissed: Fixed<Coordinates> = Fixed(Ok(None));
        assert!(!wizard.capture_location(&mut dismissed).unwrap());

        let mut denied: Fixed<String> = Fixed(Err(CaptureError::PermissionDenied));
        assert!(!wizard.capture_photo(&mut denied).unwrap());

        let mut not_an_image = Fixed(Ok(Some("hello".to_string())));
        assert!(!wizard.capture_signature(&mut not_an_image).unwrap());

        assert_eq!(wizard.draft().endereco.latitude, None);
        assert!(wizard.draft().foto_ocorrencia.is_empty());
        assert!(wizard.draft().assinatura_digital.is_empty());
        assert_eq!(
            wizard.host().notices,
            vec![
                Notice::CaptureFailed {
                    kind: CaptureKind::Photo,
                    error: CaptureError::PermissionDenied,
                },
                Notice::CaptureFailed {
                    kind: CaptureKind::Signature,
                    error: CaptureError::Failed("signature is not an image data URL".into()),
                },
            ]
        );
    }
    #[test]
    fn test_rescue_occurrence_finalizes_once() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("endereco.pontoReferencia", "Praia de Boa Viagem").unwrap();
        wizard.set_field("formsFilled.salvamento", true).unwrap();
        assert_eq!(
            wizard.submit().unwrap(),
            SubmitOutcome::AdvancedToNature(NatureKey::Salvamento)
        );
        let id = wizard.draft().id.clone();

        wizard.set_field("salvamento.ambiente", "aquático").unwrap();
        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::Finalized(id.clone()));

        let saved = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(saved.tipo, "Salvamento");
        assert_eq!(
            saved.occurrence.salvamento.map(|d| d.ambiente),
            Some("aquático".to_string())
        );
        assert_ne!(wizard.draft().id, id);
        assert_eq!(wizard.draft().active_nature(), None);
        assert_eq!(wizard.host().navigations, 1);

        assert!(matches!(wizard.submit(), Err(OccurrenceError::WizardFinished)));
        assert_eq!(wizard.host().navigations, 1);
    }

    #[test]
    fn test_nature_save_failure_keeps_step_two() {
        let store = Arc::new(RecordStore::new(ToggleBackend::new(), KEY));
        let mut wizard =
            Wizard::create(Arc::clone(&store), RecordingHost::default()).with_clock(at_2025);
        wizard.set_field("endereco.bairro", "Pina").unwrap();
        wizard.set_field("formsFilled.salvamento", true).unwrap();
        wizard.submit().unwrap();
        wizard.set_field("salvamento.ambiente", "altura").unwrap();
        let before = wizard.draft().clone();

        store.backend().fail_writes.store(true, Ordering::SeqCst);
        assert_eq!(wizard.submit().unwrap(), SubmitOutcome::SaveFailed);
        assert_eq!(wizard.step(), Step::Nature(NatureKey::Salvamento));
        assert_eq!(wizard.draft(), &before);
        assert!(!wizard.is_finished());
        assert_eq!(wizard.host().navigations, 0);
        assert!(matches!(
            wizard.host().notices.as_slice(),
            [Notice::SaveFailed { .. }]
        ));
        let stored = store.find_by_id(&before.id).unwrap().unwrap();
        assert_eq!(stored.occurrence.salvamento, None);

        store.backend().fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(
            wizard.submit().unwrap(),
            SubmitOutcome::Finalized(before.id.clone())
        );
        assert_eq!(wizard.host().navigations, 1);
    }

    #[test]
    fn test_out_of_range_list_index_is_rejected() {
        let store = memory_store();
        let mut wizard = new_wizard(&store);
        wizard.set_field("guarnicao.0", "Sgt Lima").unwrap();
        let before = wizard.draft().clone();

        for path in ["guarnicao.18446744073709551615", "guarnicao.100000000000", "guarnicao.2"] {
            let err = wizard.set_field(path, "Cb Souza").unwrap_err();
            assert!(
                matches!(err, OccurrenceError::InvalidField { .. }),
                "{path}: {err}"
            );
            assert_eq!(wizard.draft(), &before, "{path}");
        }

        wizard.set_field("guarnicao.1", "Cb Souza").unwrap();
        assert_eq!(wizard.draft().guarnicao, vec!["Sgt Lima", "Cb Souza"]);
    }

    #[test]
    fn test_captured_coordinates_read_back_unchanged() {
        let store = memory_store();
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut unit = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        for _ in 0..50 {
            let mut wizard = new_wizard(&store);
            wizard.set_field("endereco.bairro", "Boa Viagem").unwrap();
            let coords = Coordinates::new(unit() * 180.0 - 90.0, unit() * 360.0 - 180.0).unwrap();
            assert!(wizard.capture_location(&mut Fixed(Ok(Some(coords)))).unwrap());
            assert_eq!(wizard.draft().endereco.latitude, Some(coords.latitude));

            wizard.submit().unwrap();
            let saved = wizard.last_saved().unwrap();
            assert_eq!(store.find_by_id(saved.id()).unwrap().as_ref(), Some(saved));
        }
    }
}
