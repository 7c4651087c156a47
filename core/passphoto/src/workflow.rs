//! Upload → validate → process → layout sequencing.
//!
//! [`transition`] is the whole state machine: a pure function from the current
//! state and an event to the next state and, optionally, the side effect to
//! run next. [`Workflow`] owns the state, runs the effects against the
//! capabilities it borrows, and feeds their outcomes back in as events.

use image::DynamicImage;

use crate::encode::decode_image;
use crate::error::IdPhotoError;
use crate::face_detector::FaceDetector;
use crate::layout::{layout_grid, PrintSheet, SheetLayout};
use crate::process::{ProcessedPhoto, Processor};
use crate::segmenter::BackgroundRemover;
use crate::validate::{ValidationReport, Validator};

/// Why the last upload did not make it past validation.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// The photo was analysed and broke at least one rule.
    Invalid(ValidationReport),

    /// The photo could not be analysed at all.
    Error(IdPhotoError),
}

/// Where the workflow currently is. Each state carries only the artifacts
/// produced so far.
#[derive(Debug, Clone)]
pub enum WorkflowState {
    /// Waiting for a photo, with the reason the previous one was turned down.
    AwaitingUpload {
        /// Outcome of the previous attempt, if any.
        rejection: Option<Rejection>,
    },

    /// A decoded photo is being checked.
    Validating {
        /// The uploaded photo.
        image: DynamicImage,
    },

    /// A valid photo is being standardized. `error` is set when the last
    /// attempt failed and can be retried.
    Processing {
        /// The uploaded photo.
        image: DynamicImage,
        /// The passing report, carrying the detected face.
        report: ValidationReport,
        /// Failure of the last processing attempt.
        error: Option<IdPhotoError>,
    },

    /// The standardized photo is ready for sheets and downloads.
    LayoutReady {
        /// The passing report.
        report: ValidationReport,
        /// The standardized photo.
        photo: ProcessedPhoto,
    },
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::AwaitingUpload { rejection: None }
    }
}

impl WorkflowState {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingUpload { .. } => "awaiting-upload",
            WorkflowState::Validating { .. } => "validating",
            WorkflowState::Processing { .. } => "processing",
            WorkflowState::LayoutReady { .. } => "layout-ready",
        }
    }

    /// Whether an upload starts a new run from here.
    pub fn accepts_upload(&self) -> bool {
        matches!(
            self,
            WorkflowState::AwaitingUpload { .. } | WorkflowState::LayoutReady { .. }
        )
    }

    /// The most recent validation report, passing or not.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            WorkflowState::AwaitingUpload {
                rejection: Some(Rejection::Invalid(report)),
            } => Some(report),
            WorkflowState::Processing { report, .. } | WorkflowState::LayoutReady { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    /// The standardized photo, once processing succeeded.
    pub fn photo(&self) -> Option<&ProcessedPhoto> {
        match self {
            WorkflowState::LayoutReady { photo, .. } => Some(photo),
            _ => None,
        }
    }

    /// The error recorded by the last failed step, if the state holds one.
    pub fn error(&self) -> Option<&IdPhotoError> {
        match self {
            WorkflowState::AwaitingUpload {
                rejection: Some(Rejection::Error(error)),
            } => Some(error),
            WorkflowState::Processing {
                error: Some(error), ..
            } => Some(error),
            _ => None,
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// A decoded photo was supplied.
    Uploaded(DynamicImage),
    /// Validation finished with a report.
    Validated(ValidationReport),
    /// Processing finished with a photo.
    Processed(ProcessedPhoto),
    /// The running step failed.
    Failed(IdPhotoError),
    /// Run processing again after a failure.
    Retry,
    /// Discard everything and start over.
    Reset,
}

impl WorkflowEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::Uploaded(_) => "uploaded",
            WorkflowEvent::Validated(_) => "validated",
            WorkflowEvent::Processed(_) => "processed",
            WorkflowEvent::Failed(_) => "failed",
            WorkflowEvent::Retry => "retry",
            WorkflowEvent::Reset => "reset",
        }
    }
}

/// Work the driver must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Validate the image held by [`WorkflowState::Validating`].
    RunValidation,
    /// Process the image held by [`WorkflowState::Processing`].
    RunProcessing,
}

/// Compute the next state. Pairs without a rule leave the state unchanged.
pub fn transition(
    state: WorkflowState,
    event: WorkflowEvent,
) -> (WorkflowState, Option<Effect>) {
    use WorkflowEvent as E;
    use WorkflowState as S;

    let from = state.name();
    let label = event.name();

    let (next, effect) = match (state, event) {
        (_, E::Reset) => (S::default(), None),

        (S::AwaitingUpload { .. } | S::LayoutReady { .. }, E::Uploaded(image)) => {
            (S::Validating { image }, Some(Effect::RunValidation))
        }
        (S::AwaitingUpload { .. } | S::LayoutReady { .. }, E::Failed(error)) => (
            S::AwaitingUpload {
                rejection: Some(Rejection::Error(error)),
            },
            None,
        ),

        (S::Validating { image }, E::Validated(report)) => {
            if report.is_valid() {
                (
                    S::Processing {
                        image,
                        report,
                        error: None,
                    },
                    Some(Effect::RunProcessing),
                )
            } else {
                (
                    S::AwaitingUpload {
                        rejection: Some(Rejection::Invalid(report)),
                    },
                    None,
                )
            }
        }
        (S::Validating { .. }, E::Failed(error)) => (
            S::AwaitingUpload {
                rejection: Some(Rejection::Error(error)),
            },
            None,
        ),

        (S::Processing { report, error: None, .. }, E::Processed(photo)) => {
            (S::LayoutReady { report, photo }, None)
        }
        (
            S::Processing {
                image,
                report,
                error: None,
            },
            E::Failed(error),
        ) => (
            S::Processing {
                image,
                report,
                error: Some(error),
            },
            None,
        ),
        (
            S::Processing {
                image,
                report,
                error: Some(_),
            },
            E::Retry,
        ) => (
            S::Processing {
                image,
                report,
                error: None,
            },
            Some(Effect::RunProcessing),
        ),

        (state, event) => {
            log::warn!("ignoring '{}' in state {}", event.name(), state.name());
            (state, None)
        }
    };

    log::debug!("{from} --{label}--> {}", next.name());
    (next, effect)
}

/// Drives [`transition`] with real capabilities.
///
/// Every call runs to completion: when it returns, the state is one of
/// `AwaitingUpload`, `Processing` (with an error) or `LayoutReady`.
pub struct Workflow<'a> {
    detector: &'a dyn FaceDetector,
    segmenter: &'a dyn BackgroundRemover,
    validator: Validator,
    processor: Processor,
    state: WorkflowState,
}

impl<'a> Workflow<'a> {
    /// Start in `AwaitingUpload` with default validator and processor settings.
    pub fn new(detector: &'a dyn FaceDetector, segmenter: &'a dyn BackgroundRemover) -> Self {
        Self {
            detector,
            segmenter,
            validator: Validator::new(),
            processor: Processor::new(),
            state: WorkflowState::default(),
        }
    }

    /// Replace the validator configuration.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the processor configuration.
    pub fn processor(mut self, processor: Processor) -> Self {
        self.processor = processor;
        self
    }

    /// Current state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Decode `bytes` and run validation and, if it passes, processing.
    ///
    /// A photo that breaks the rules is `Ok` with an invalid report. Decode,
    /// model and processing failures are `Err` and are also kept in the state.
    pub fn upload(&mut self, bytes: &[u8]) -> Result<&ValidationReport, IdPhotoError> {
        self.check_accepts_upload()?;
        match decode_image(bytes) {
            Ok(image) => self.upload_image(image),
            Err(err) => {
                self.apply(WorkflowEvent::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Same as [`Workflow::upload`] for an already decoded image.
    pub fn upload_image(
        &mut self,
        image: DynamicImage,
    ) -> Result<&ValidationReport, IdPhotoError> {
        self.check_accepts_upload()?;
        self.drive(WorkflowEvent::Uploaded(image))?;
        self.state
            .report()
            .ok_or(IdPhotoError::NotReady("validation produced no report"))
    }

    /// Run processing again after it failed.
    pub fn retry(&mut self) -> Result<&ProcessedPhoto, IdPhotoError> {
        if !matches!(
            self.state,
            WorkflowState::Processing {
                error: Some(_), ..
            }
        ) {
            return Err(IdPhotoError::NotReady("there is no failed processing step to retry"));
        }
        self.drive(WorkflowEvent::Retry)?;
        self.state
            .photo()
            .ok_or(IdPhotoError::NotReady("processing produced no photo"))
    }

    /// Discard all artifacts and wait for a new upload.
    pub fn reset(&mut self) {
        self.apply(WorkflowEvent::Reset);
    }

    /// Render a print sheet of the standardized photo.
    pub fn sheet(&self, layout: SheetLayout) -> Result<PrintSheet, IdPhotoError> {
        let photo = self
            .state
            .photo()
            .ok_or(IdPhotoError::NotReady("no processed photo yet"))?;
        layout_grid(photo, layout)
    }

    fn check_accepts_upload(&self) -> Result<(), IdPhotoError> {
        if self.state.accepts_upload() {
            Ok(())
        } else {
            Err(IdPhotoError::NotReady(
                "retry or reset the current photo before uploading another",
            ))
        }
    }

    fn apply(&mut self, event: WorkflowEvent) -> Option<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effect) = transition(state, event);
        self.state = state;
        effect
    }

    fn drive(&mut self, event: WorkflowEvent) -> Result<(), IdPhotoError> {
        let mut effect = self.apply(event);
        while let Some(next) = effect {
            match self.run(next) {
                Ok(event) => effect = self.apply(event),
                Err(err) => {
                    log::warn!("{} failed: {err}", self.state.name());
                    self.apply(WorkflowEvent::Failed(err.clone()));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn run(&self, effect: Effect) -> Result<WorkflowEvent, IdPhotoError> {
        match (effect, &self.state) {
            (Effect::RunValidation, WorkflowState::Validating { image }) => self
                .validator
                .validate(image, self.detector)
                .map(WorkflowEvent::Validated),
            (Effect::RunProcessing, WorkflowState::Processing { image, report, .. }) => {
                let face = report
                    .face_data()
                    .ok_or(IdPhotoError::NotReady("validated report carries no face"))?;
                self.processor
                    .process(image, face, self.segmenter)
                    .map(WorkflowEvent::Processed)
            }
            _ => Err(IdPhotoError::NotReady("effect does not match workflow state")),
        }
    }
}
