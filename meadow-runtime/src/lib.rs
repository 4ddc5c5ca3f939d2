//! Components, the directive compiler and the render loop.
//!
//! A template is parsed once per component definition (`registry`), then on
//! every render compiled against the instance's state into a `VNodeConfig`
//! tree (`directives`, `eval`), turned into virtual nodes (`render`) and
//! diffed against the previous tree (`instance`).

pub mod component;
pub mod directives;
pub mod error;
pub mod eval;
pub mod instance;
pub mod registry;
pub mod render;
pub mod vconf;

pub use component::{ChildComponents, Component, ComponentDef, ComponentId, ComponentKind};
pub use directives::{Weight, compile, directive, unregister};
pub use error::{ExprError, RenderError};
pub use eval::{evaluate, interpolate, try_evaluate};
pub use instance::{Context, WeakContext, mount};
pub use vconf::{ElementConfig, EventDirective, Slot, TextConfig, TransitionData, VNodeConfig};
