//! The render contract shared by every node of a statement graph.

use crate::args::BuildArguments;
use crate::error::SqlResult;
use crate::writer::SqlWriter;

/// A node that can write itself into a [`SqlWriter`].
///
/// `args` is shared by the whole render pass: tables register aliases in it and
/// values become parameters through it, so call order is output order.
pub trait RenderElement {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()>;
}
