//! Analysis passes shared by every system: overload analysis and dispatch,
//! inheritance queries and member merging.

pub mod dispatch;
pub mod inheritance;
pub mod members;
pub mod operation;

pub use dispatch::{build_dispatch, Check, Dispatch};
pub use inheritance::InheritanceResolver;
pub use members::{pair_up_attributes, AttributePair};
pub use operation::{analyze_constructor, analyze_operation, OperationInfo, Overload, ParamInfo};
