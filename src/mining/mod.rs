/*!
 * The mining pipeline.
 *
 * - `event`: mining events, snapshots and acknowledgements
 * - `playback`, `capture`, `presentation`: collaborator seams
 * - `interruption`: saving and restoring the view around other surfaces
 * - `editor`: the card editor surface
 * - `orchestrator`: the mining state machine
 * - `play_mode`: auto-pause, condensed and repeat playback
 * - `bulk_export`: the unattended export scheduler
 */

pub use self::bulk_export::{BulkExportMessage, BulkExportScheduler};
pub use self::capture::{
    AudioClip, CapturedMedia, ExportTarget, ForwardOutcome, MediaCapture, RecordingRequest, Screenshot,
};
pub use self::editor::EditorUi;
pub use self::event::{CardExported, MiningEvent, PostMineAction, PostMinePlayback, RecordingWindow, ResumableSnapshot};
pub use self::orchestrator::{MiningCollaborators, Orchestrator, OrchestratorState};
pub use self::play_mode::{AutoPausePreference, PlayMode, PlayModeAction, PlayModeState};
pub use self::playback::PlaybackAdapter;
pub use self::presentation::{Notification, Presentation};

pub mod bulk_export;
pub mod capture;
pub mod editor;
pub mod event;
pub mod interruption;
pub mod orchestrator;
pub mod play_mode;
pub mod playback;
pub mod presentation;
