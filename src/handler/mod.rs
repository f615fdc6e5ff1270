//! Request dispatch
//!
//! Routes a parsed request to the method handler, binds it to a session and
//! decides whether the connection writes a ready response or runs a script.

pub mod cgi;
pub mod path;
pub mod static_files;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::http::mime::MimeTable;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder};
use crate::session::{Session, SessionStore, set_cookie_value};

pub use cgi::{CgiOutcome, CgiRunner};
pub use path::{DocumentRoot, PathError};

/// What the connection has to do with a request
#[derive(Debug)]
pub enum Dispatch {
    /// Write this response
    Respond(Response),
    /// Run the script and stream its output
    Execute {
        script: PathBuf,
        set_cookie: Option<String>,
    },
}

/// Owns everything a request can touch, including the session table.
pub struct Dispatcher {
    root: DocumentRoot,
    mime: MimeTable,
    sessions: SessionStore,
    cookie_name: String,
    session_endpoint: String,
    script_extensions: Vec<String>,
    cgi: CgiRunner,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            root: DocumentRoot::new(
                config.static_files.root.as_str(),
                config.static_files.index.as_str(),
            ),
            mime: MimeTable::new(config.static_files.default_mime.as_str()),
            sessions: SessionStore::new(config.sessions.capacity),
            cookie_name: config.sessions.cookie_name.clone(),
            session_endpoint: config.sessions.endpoint.clone(),
            script_extensions: config.cgi.extensions.clone(),
            cgi: CgiRunner::new(&config.cgi),
        }
    }

    pub fn cgi(&self) -> &CgiRunner {
        &self.cgi
    }

    pub async fn dispatch(&mut self, request: &Request) -> Dispatch {
        match &request.method {
            Method::GET => self.serve_file(request, false).await,
            Method::HEAD => self.serve_file(request, true).await,
            Method::POST => self.run_script(request).await,
            Method::Extension(token) => {
                tracing::debug!(method = token.as_str(), "Method not implemented");
                Dispatch::Respond(Response::not_implemented())
            }
        }
    }

    async fn serve_file(&mut self, request: &Request, head_only: bool) -> Dispatch {
        let (session, set_cookie) = self.bind_session(request);

        if request.path == self.session_endpoint {
            let response = match session {
                Some(session) => session_page(&session, head_only),
                None => Response::service_unavailable(),
            };
            return Dispatch::Respond(response.with_cookie(set_cookie));
        }

        let response = match self.root.resolve(&request.path) {
            Ok(resolved) if head_only => static_files::head(&resolved, &self.mime).await,
            Ok(resolved) => static_files::get(&resolved, &self.mime).await,
            Err(e) => rejected(e),
        };

        Dispatch::Respond(response.with_cookie(set_cookie))
    }

    async fn run_script(&mut self, request: &Request) -> Dispatch {
        let (_, set_cookie) = self.bind_session(request);

        let response = match self.root.resolve(&request.path) {
            Ok(resolved) if self.is_runnable(&request.path, &resolved).await => {
                return Dispatch::Execute {
                    script: resolved,
                    set_cookie,
                };
            }
            Ok(_) => Response::not_found(),
            Err(e) => rejected(e),
        };

        Dispatch::Respond(response.with_cookie(set_cookie))
    }

    /// Finds or creates the request's session.
    ///
    /// Returns the `Set-Cookie` value when a session was created. A full
    /// table leaves the request without a session.
    fn bind_session(&mut self, request: &Request) -> (Option<Session>, Option<String>) {
        match self.sessions.bind(request.cookie(&self.cookie_name)) {
            Ok(binding) => {
                let cookie = binding
                    .created
                    .then(|| set_cookie_value(&self.cookie_name, &binding.session));
                (Some(binding.session), cookie)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request served without a session");
                (None, None)
            }
        }
    }

    async fn is_runnable(&self, request_path: &str, resolved: &Path) -> bool {
        if !cgi::is_script(request_path, &self.script_extensions) {
            tracing::debug!(path = request_path, "POST target is not a script");
            return false;
        }
        tokio::fs::metadata(resolved)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

fn rejected(error: PathError) -> Response {
    tracing::warn!(error = %error, "Rejected request path");
    Response::bad_request()
}

fn session_page(session: &Session, head_only: bool) -> Response {
    let body = format!(
        "<h1>Welcome to the server!</h1><p>Your session ID: {}</p><p>User: {}</p>",
        session.id, session.user_data
    );
    let page = Response::ok("text/html", body);

    if head_only {
        ResponseBuilder::new(page.status)
            .content_type(page.content_type)
            .content_length(page.content_length)
            .build()
    } else {
        page
    }
}
