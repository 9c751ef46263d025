pub mod blocks;
pub mod densenet;
pub mod init;
pub mod sequential;
pub mod topology;

pub use blocks::{Bottleneck, SingleLayer, Transition};
pub use densenet::DenseNet;
pub use sequential::Sequential;
pub use topology::ChannelPlan;
