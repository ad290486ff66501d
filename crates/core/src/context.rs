/// Network origin of a request, recorded alongside audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller IP address if the transport exposed one.
    pub ip_address: Option<String>,
    /// Caller user-agent header if present.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Creates a context from optional origin metadata.
    #[must_use]
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }
}
