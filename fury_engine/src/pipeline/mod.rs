/// Declarative render pipeline: descriptors, pass actions and the
/// execution engine

pub mod descriptor;
pub mod draw_item;
pub mod frame_report;
pub mod pass_action;
pub mod render_pipeline;

pub use descriptor::{
    BindingSource, DrawFilter, InputBinding, OutputBinding, OutputSize, OutputTarget, PassDesc,
    PassKind, PipelineDesc, ResourceDecl,
};
pub use draw_item::{mesh_sort_key, sort_draw_items, DrawItem, DrawKind};
pub use frame_report::{BindingRecord, FrameReport, PassRecord, PassSignature, PassStatus};
pub use pass_action::{
    CustomAction, FullscreenAction, GeometryAction, LightingAction, PassAction, PassActionTable,
    PassContext, ShadowAction, LIGHTING_FLAGS_OFFSET, LIGHT_DATA_OFFSET, SHADOW_LAYER_OFFSET,
};
pub use render_pipeline::{FrameContext, RenderPipeline};
