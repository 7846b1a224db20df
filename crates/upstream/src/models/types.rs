use std::borrow::Cow;

/// Provider identifier (e.g., "KUDAGO", "CBR")
pub type ProviderId = Cow<'static, str>;
