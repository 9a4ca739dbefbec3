/// Per-frame execution report.
///
/// `RenderPipeline::execute` never fails as a whole: what happened to each
/// pass is recorded here instead.

use crate::error::Error;
use crate::pool::ShapeKey;
use super::descriptor::PassKind;

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq)]
pub enum PassStatus {
    /// Ran with every input available
    Executed,
    /// Ran with at least one input unavailable
    Degraded,
    /// Did not run; its outputs are unavailable for the rest of the frame
    Skipped(Error),
}

impl PassStatus {
    pub fn is_skipped(&self) -> bool {
        matches!(self, PassStatus::Skipped(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PassStatus::Degraded)
    }
}

/// A resolved input or output binding
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRecord {
    pub name: String,
    /// Shape of the bound resource, `None` when unavailable
    pub shape: Option<ShapeKey>,
    /// Device id of the bound resource
    pub resource_id: Option<u64>,
}

impl BindingRecord {
    pub fn is_available(&self) -> bool {
        self.shape.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub name: String,
    pub kind: PassKind,
    pub status: PassStatus,
    pub inputs: Vec<BindingRecord>,
    pub outputs: Vec<BindingRecord>,
    pub draw_count: usize,
}

impl PassRecord {
    pub fn input(&self, name: &str) -> Option<&BindingRecord> {
        self.inputs.iter().find(|b| b.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&BindingRecord> {
        self.outputs.iter().find(|b| b.name == name)
    }
}

/// (pass kind, input shapes, output shapes) of one executed pass
pub type PassSignature = (PassKind, Vec<Option<ShapeKey>>, Vec<Option<ShapeKey>>);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub passes: Vec<PassRecord>,
}

impl FrameReport {
    pub fn pass(&self, name: &str) -> Option<&PassRecord> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Ordered pass signatures, comparable across pipeline reloads
    pub fn signature(&self) -> Vec<PassSignature> {
        self.passes
            .iter()
            .map(|p| {
                (
                    p.kind,
                    p.inputs.iter().map(|b| b.shape).collect(),
                    p.outputs.iter().map(|b| b.shape).collect(),
                )
            })
            .collect()
    }

    pub fn skipped_count(&self) -> usize {
        self.passes.iter().filter(|p| p.status.is_skipped()).count()
    }

    pub fn total_draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.draw_count).sum()
    }

    /// True when no pass was skipped or degraded
    pub fn is_complete(&self) -> bool {
        self.passes.iter().all(|p| p.status == PassStatus::Executed)
    }
}
