//! Human-in-the-loop curation of error cases.

pub mod correct;
pub mod display;
pub mod explore;
pub mod patch;

pub use correct::{
    begin_session, correct_cases, default_correction_path, finish_session,
    prepare_correction_file, CorrectionState, SessionStats,
};
pub use display::{format_g, render_case};
pub use explore::Explorer;
pub use patch::{corrections_to_dataset, patch_dataset, reformulation_map};
