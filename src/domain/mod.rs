// Domain layer: core models and ports (interfaces) shared by adapters and core.

pub mod model;
pub mod ports;
