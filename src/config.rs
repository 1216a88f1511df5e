/// Maximum number of layers a single decode may produce.
pub const DECODE_MAX_DEPTH: usize = 8;

/// Maximum number of ethertypes a decoder dispatches on.
pub const REGISTRY_ETHERTYPE_COUNT: usize = 8;
/// Maximum number of IP versions a decoder dispatches on.
pub const REGISTRY_IP_VERSION_COUNT: usize = 4;
/// Maximum number of IP protocols a decoder dispatches on.
pub const REGISTRY_PROTOCOL_COUNT: usize = 16;
