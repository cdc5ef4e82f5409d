pub mod boundary;
pub mod config;
pub mod content;
pub mod demo;
pub mod generate;
pub mod gesture;
pub mod progress;
pub mod projection;
pub mod quiz;
pub mod session;
pub mod viewport;
pub mod wasm;

pub use boundary::{
    BoundaryCache, BoundaryCollection, BoundaryError, BoundaryKey, BoundaryKind, BoundaryLoad,
    BoundarySource, GeoRegion, LoadState, LoadTicket,
};
pub use config::{ConfigError, DataConfig, EngineConfig, GestureConfig, QuizTuning, ViewportConfig};
pub use content::{
    AreaCode, Content, ContentLoadError, Municipality, MunicipalityPrefecture, River, Road,
    StudyQuestion,
};
pub use demo::{DEMO_MAP_SURFACE, DEMO_QUESTION_COUNT, demo_boundaries, demo_content};
pub use gesture::{GestureOutcome, GestureState, GestureTracker};
pub use hit_test::{RegionClick, RegionHitTester, RegionIndex};
pub use progress::{
    CurriculumProgress, FileStorage, MemoryStorage, ProgressRecord, ProgressStore, QuizResult,
    ResultSink, ScopeScore, StorageBackend, StorageError, level_name,
};
pub use projection::{AffineProjection, LatLng, MapProjection, MapSurface, Point, ProjectionError};
pub use quiz::{
    Answer, AnswerScheme, Draw, Prompt, QuizDomain, QuizOption, QuizQuestion, Scope, clear_key,
};
pub use session::{Feedback, GeoQuiz, Phase, QuizPlan, QuizSession, QuizStrategy, SessionOutcome};
pub use viewport::{Rect, SurfaceSize, ViewportController};
