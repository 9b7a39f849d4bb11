//! Centralized limits and thresholds for the veld compiler.
//!
//! Shared constants for recursion depths and iteration counts used by the
//! CFG builder and the flow analyses. Centralizing these prevents duplicate
//! definitions with inconsistent values and documents the rationale for
//! each limit.

/// Maximum depth for the CFG builder's recursive descent over a body.
///
/// Each nested statement or expression adds one frame. Bodies deeper than
/// this are rejected as malformed rather than risking a stack overflow.
pub const MAX_CFG_BUILD_DEPTH: u32 = 500;

/// Hard ceiling on worklist iterations in the dataflow fixed point,
/// expressed as a multiple of the block count.
///
/// The lattice has finite height and transfer functions are monotone, so
/// the fixed point converges well below this bound on well-formed graphs.
/// The ceiling is a backstop: if it is ever hit, the solver widens all
/// facts to lattice top (declared types), which is always sound.
pub const MAX_FIXPOINT_PASSES_PER_BLOCK: usize = 64;

/// Maximum number of candidate types tracked in a single refinement set.
///
/// Sealed hierarchies in practice have a handful of variants; a refinement
/// set that grows past this is collapsed to the declared type.
pub const MAX_REFINEMENT_CANDIDATES: usize = 32;

/// Maximum nesting depth of enhancement positions (generic arguments plus
/// supertype arguments) the enhancer will walk before falling back to
/// platform nullability for the remainder of the type.
pub const MAX_ENHANCEMENT_DEPTH: u32 = 100;
