//! # Transports
//!
//! The dispatch client hands fully prepared requests to a [`Transport`]. The
//! response is returned untouched: status handling belongs to the caller.

use crate::client::OutgoingRequest;

/// Delivers an [`OutgoingRequest`].
pub trait Transport {
    /// What a successful delivery yields.
    type Response;
    /// Delivery failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends the request.
    fn send(&self, request: OutgoingRequest) -> Result<Self::Response, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Response = T::Response;
    type Error = T::Error;

    fn send(&self, request: OutgoingRequest) -> Result<Self::Response, Self::Error> {
        (**self).send(request)
    }
}

#[cfg(feature = "client")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "client")]
mod ureq_transport {
    use super::Transport;
    use crate::client::OutgoingRequest;
    use crate::error::TransportError;
    use std::time::Duration;
    use ureq::http::{Request, Response};
    use ureq::{Agent, AsSendBody, Body};

    /// Blocking HTTP transport on a `ureq` agent.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            let config = Agent::config_builder().http_status_as_error(false).build();
            Self {
                agent: Agent::new_with_config(config),
            }
        }
    }

    impl UreqTransport {
        /// A transport on a default agent.
        pub fn new() -> Self {
            Self::default()
        }

        /// A transport on a preconfigured agent.
        pub fn with_agent(agent: Agent) -> Self {
            Self { agent }
        }

        fn run(
            &self,
            request: Request<impl AsSendBody>,
            timeout: Option<Duration>,
        ) -> Result<Response<Body>, TransportError> {
            let response = match timeout {
                Some(timeout) => {
                    let request = self
                        .agent
                        .configure_request(request)
                        .timeout_global(Some(timeout))
                        .build();
                    self.agent.run(request)?
                }
                None => self.agent.run(request)?,
            };
            Ok(response)
        }
    }

    impl Transport for UreqTransport {
        type Response = Response<Body>;
        type Error = TransportError;

        fn send(&self, request: OutgoingRequest) -> Result<Self::Response, Self::Error> {
            let mut builder = Request::builder()
                .method(request.method.as_str())
                .uri(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            match request.body {
                Some(body) => self.run(builder.body(body)?, request.timeout),
                None => self.run(builder.body(())?, request.timeout),
            }
        }
    }
}
