//! Shell state and command handling.

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::debug;

use sessiongate_core::{Config, NavigationOutcome, ServerRenderSessions, SessionContext};

const HELP: &str = "\
Commands:
  login [username]        sign in (password from SESSIONGATE_PASSWORD or prompt)
  visit <path>            navigate on the client, renewing if needed
  render <path> [cookie]  navigate as a server-rendered request with its own session
  refresh                 renew the access credential now
  status                  show whether a credential is held
  get <path>              authenticated GET, prints the JSON response
  logout                  sign out locally and revoke the server session
  help                    show this text
  quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String> },
    Visit { path: String },
    Render { path: String, cookie: Option<String> },
    Refresh,
    Status,
    Get { path: String },
    Logout,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            bail!("Empty command");
        };
        let arg = parts.next().map(str::to_string);
        // The cookie header may contain spaces ("a=1; b=2").
        let rest: Vec<&str> = parts.collect();
        let rest = (!rest.is_empty()).then(|| rest.join(" "));

        let require_path = |arg: Option<String>| {
            arg.with_context(|| format!("`{}` needs a path", name))
        };

        Ok(match name {
            "login" => Command::Login { username: arg },
            "visit" | "go" => Command::Visit { path: require_path(arg)? },
            "render" => Command::Render {
                path: require_path(arg)?,
                cookie: rest,
            },
            "refresh" => Command::Refresh,
            "status" => Command::Status,
            "get" => Command::Get { path: require_path(arg)? },
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command `{}` (try `help`)", other),
        })
    }
}

pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: Config,
    session: SessionContext,
    renders: ServerRenderSessions,
    current_route: String,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let session = SessionContext::client(&config).context("Failed to create HTTP client")?;
        let renders = ServerRenderSessions::new(&config).context("Failed to create HTTP client")?;
        let current_route = config.landing_route.clone();
        Ok(Self {
            config,
            session,
            renders,
            current_route,
        })
    }

    pub fn prompt(&self) -> String {
        let marker = if self.session.store().is_present() { "*" } else { "" };
        format!("{}{}", self.current_route, marker)
    }

    pub async fn run(&mut self, command: Command) -> Result<Flow> {
        debug!(?command, "Running command");
        match command {
            Command::Login { username } => self.login(username).await?,
            Command::Visit { path } => {
                let outcome = self.session.before_navigate(&path).await;
                self.current_route = Self::report(&path, &outcome);
            }
            Command::Render { path, cookie } => {
                // A fresh request-scoped session, as the server-rendering path requires.
                let request = self.renders.for_request(cookie.as_deref());
                let outcome = request.before_navigate(&path).await;
                Self::report(&path, &outcome);
                if !request.store().is_present() {
                    println!("  (rendered without a credential; the client pass will renew)");
                }
            }
            Command::Refresh => {
                let credential = self.session.refresh().await?;
                println!(
                    "Renewed, valid for {} more minutes",
                    credential.minutes_until_expiry()
                );
            }
            Command::Status => self.status(),
            Command::Get { path } => {
                let body: serde_json::Value = self.session.api().get(&path).await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Command::Logout => {
                let notification = self.session.sign_out();
                println!("Signed out");
                self.current_route = self.config.landing_route.clone();
                notification.await;
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Print a navigation outcome and return the route the user ends up on.
    fn report(path: &str, outcome: &NavigationOutcome) -> String {
        match outcome {
            NavigationOutcome::Proceed => {
                println!("-> {}", path);
                path.to_string()
            }
            NavigationOutcome::Redirect { to } => {
                println!("-> redirected to {}", to);
                to.clone()
            }
        }
    }

    fn status(&self) {
        match self.session.store().read() {
            Some(credential) if credential.is_expired() => {
                println!("Holding an expired credential; the server will reject it")
            }
            Some(credential) => {
                println!(
                    "Signed in, credential expires in {} minutes",
                    credential.minutes_until_expiry()
                );
                if credential.needs_refresh() {
                    println!("  (expiring soon, run `refresh`)");
                }
            }
            None => println!("Signed out"),
        }
    }

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.or_else(|| std::env::var("SESSIONGATE_USERNAME").ok()) {
            Some(username) => username,
            None => Self::prompt_username()?,
        };
        let password = match std::env::var("SESSIONGATE_PASSWORD") {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };

        if username.is_empty() || password.is_empty() {
            bail!("Username and password required");
        }

        self.session
            .login(&username, &password)
            .await
            .context("Login failed")?;
        println!("Login successful!");
        Ok(())
    }

    fn prompt_username() -> Result<String> {
        print!("Username: ");
        io::stdout().flush()?;

        let mut username = String::new();
        io::stdin().read_line(&mut username)?;
        Ok(username.trim().to_string())
    }
}
