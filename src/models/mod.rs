//! Data models for the awards workflow
//!
//! Entities are grouped by workflow stage: cycles gate nominations,
//! nominations feed panel review, panel completion unblocks awards.

pub mod award;
pub mod cycle;
pub mod form;
pub mod nomination;
pub mod panel;
pub mod user;

pub use award::{Award, AwardType, CreateAwardRequest, CreateAwardTypeRequest, UpdateAwardRequest};
pub use cycle::{CreateCycleRequest, Cycle, CycleStatus, UpdateCycleRequest};
pub use form::{
    find_duplicate_key, CreateFormRequest, FieldSpec, Form, FormAnswer, FormField,
    UpdateFormRequest,
};
pub use nomination::{AnswerInput, CreateNominationRequest, Nomination, NominationStatus};
pub use panel::{
    AddMemberRequest, AssignPanelsRequest, AssignmentStatus, CreatePanelRequest,
    CreateTaskRequest, Panel, PanelAssignment, PanelMember, PanelMemberRole, PanelReview,
    PanelTask, SubmitReviewRequest,
};
pub use user::{CreateUserRequest, User, UserRole};
