//! Operation pipeline: declare (`ir`), decode and combine conditions
//! (`condition`), render (`compile`), split (`slice`), compose (`hierarchy`),
//! look up (`registry`) and hand off to a backend (`executor`).

pub mod compile;
pub mod condition;
pub mod executor;
pub mod hierarchy;
pub mod ir;
pub mod registry;
pub mod slice;
