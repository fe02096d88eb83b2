//! Interactive session: startup prompts, the input loop and the printer task.
//!
//! The input loop reads one line at a time. While the menu is open a line
//! is a menu choice (or the argument a menu entry asked for); otherwise it
//! is a chat message or a slash command. Inbound events are printed by a
//! separate task so traffic shows up while the user is typing.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{ClientEvent, ClientSettings, ConnectionManager};
use crate::config::{Config, ServerEntry};
use crate::console::Console;
use crate::error::{ClientError, Result};
use crate::event::ProtocolEvent;
use crate::identity::{Identity, IdentityStore};
use crate::menu::{MenuAction, MenuOutcome, MenuStateMachine, PromptKind};
use crate::transport::Transport;

const QUIT_MESSAGE: &str = "Leaving";

const HELP: &str = "Type a message to send it to the current channel.\n\
/menu opens the menu, /raw <line> sends a raw IRC line, /quit [reason] exits.";

/// Choices made on the command line; unset fields are asked for.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub nickname: Option<String>,
    pub server: Option<String>,
    pub channel: Option<String>,
}

/// What the input loop got.
enum Input {
    Line(String),
    /// Stdin closed or interrupted.
    Closed,
    /// The connection dropped while waiting.
    Lost,
}

enum Flow {
    Continue,
    Quit,
}

/// One interactive run of the client.
pub struct Session<R, W: Write> {
    config: Config,
    manager: ConnectionManager,
    events: Option<mpsc::UnboundedReceiver<ClientEvent>>,
    identities: IdentityStore,
    menu: MenuStateMachine,
    console: Arc<Mutex<Console<W>>>,
    input: Lines<R>,
    pending: Option<PromptKind>,
    lost: Arc<Notify>,
    interrupt: CancellationToken,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    pub fn new(config: Config, identities: IdentityStore, input: R, console: Console<W>) -> Self {
        let (manager, events) = ConnectionManager::new(ClientSettings::from_config(&config));
        Self {
            config,
            manager,
            events: Some(events),
            identities,
            menu: MenuStateMachine::new(),
            console: Arc::new(Mutex::new(console)),
            input: input.lines(),
            pending: None,
            lost: Arc::new(Notify::new()),
            interrupt: CancellationToken::new(),
        }
    }

    /// Handle to the connection, for callers that observe the session.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Token that ends the session with an orderly QUIT when cancelled.
    /// Ctrl-C cancels it once the session is running.
    pub fn interrupter(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    /// Ask for what is missing, connect, then run the input loop.
    pub async fn run(mut self, opts: SessionOptions) -> Result<()> {
        self.start_printer();
        self.watch_ctrl_c();

        let nickname = match opts.nickname {
            Some(nickname) => nickname,
            None => {
                let default = self.config.client.nickname.clone();
                match self.ask(&format!("Enter nickname [{}]: ", default)).await? {
                    Some(answer) if !answer.is_empty() => answer,
                    Some(_) => default,
                    None => return Ok(()),
                }
            }
        };

        let entry = match opts.server {
            Some(server) => match self.config.resolve_server(&server) {
                Some(entry) => entry,
                None => {
                    self.say(&format!("Unknown server: {}", server))?;
                    return Err(ClientError::Connect(format!("unknown server {:?}", server)));
                }
            },
            None => match self.choose_server().await? {
                Some(entry) => entry,
                None => return Ok(()),
            },
        };

        self.say(&format!("Connecting to {}...", entry))?;
        match self.connect_unless_interrupted(&entry, &nickname).await {
            Ok(true) => {}
            Ok(false) => return self.say("Interrupted."),
            Err(e) => {
                self.say(&format!("Connection failed: {}", e))?;
                return Err(e);
            }
        }

        let channel = opts.channel.or_else(|| self.config.client.channel.clone());
        self.after_connect(channel)?;
        self.input_loop().await
    }

    /// Register over `transport` and run the input loop.
    pub async fn run_with(
        mut self,
        transport: Transport,
        server: &str,
        nickname: &str,
        channel: Option<String>,
    ) -> Result<()> {
        self.start_printer();
        self.watch_ctrl_c();
        tokio::select! {
            result = self.manager.connect_with(transport, server, 6667, nickname) => result?,
            _ = self.interrupt.cancelled() => {
                self.manager.disconnect(Some(QUIT_MESSAGE)).await;
                return self.say("Interrupted.");
            }
        }
        self.after_connect(channel)?;
        self.input_loop().await
    }

    /// Connect, or send QUIT and return `Ok(false)` if interrupted first.
    async fn connect_unless_interrupted(
        &self,
        entry: &ServerEntry,
        nickname: &str,
    ) -> Result<bool> {
        let use_proxy = self.config.client.use_proxy;
        tokio::select! {
            result = self.manager.connect(entry, nickname, use_proxy) => result.map(|()| true),
            _ = self.interrupt.cancelled() => {
                self.manager.disconnect(Some(QUIT_MESSAGE)).await;
                Ok(false)
            }
        }
    }

    fn watch_ctrl_c(&self) {
        let interrupt = self.interrupt.clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => interrupt.cancel(),
                    Err(e) => warn!("cannot listen for Ctrl-C: {}", e),
                },
                _ = interrupt.cancelled() => {}
            }
        });
    }

    fn start_printer(&mut self) {
        if let Some(events) = self.events.take() {
            tokio::spawn(print_events(
                events,
                Arc::clone(&self.console),
                Arc::clone(&self.lost),
            ));
        }
    }

    fn after_connect(&mut self, channel: Option<String>) -> Result<()> {
        let nickname = self.manager.snapshot().nickname;
        self.say(&format!("Connected as {}.", nickname))?;
        if let Some(channel) = channel {
            self.join(&channel)?;
        }
        self.console.lock().block(HELP)?;
        Ok(())
    }

    async fn choose_server(&mut self) -> Result<Option<ServerEntry>> {
        let listing = self.server_listing();
        self.console.lock().block(&listing)?;
        loop {
            let Some(answer) = self.ask("Select server [1]: ").await? else {
                return Ok(None);
            };
            let answer = if answer.is_empty() { "1".to_string() } else { answer };
            match self.config.resolve_server(&answer) {
                Some(entry) => return Ok(Some(entry)),
                None => self.say(&format!("Unknown server: {}", answer))?,
            }
        }
    }

    fn server_listing(&self) -> String {
        let mut listing = String::from("Available servers:");
        for (i, entry) in self.config.servers.iter().enumerate() {
            listing.push_str(&format!("\n{}. {}", i + 1, entry));
        }
        listing
    }

    /// Prompt and read one trimmed answer; `None` when input ended.
    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.console.lock().prompt(question)?;
        match self.read_input().await? {
            Input::Line(line) => Ok(Some(line.trim().to_string())),
            Input::Closed | Input::Lost => Ok(None),
        }
    }

    async fn read_input(&mut self) -> Result<Input> {
        let input = tokio::select! {
            line = self.input.next_line() => match line? {
                Some(line) => Input::Line(line),
                None => Input::Closed,
            },
            _ = self.interrupt.cancelled() => Input::Closed,
            _ = self.lost.notified() => Input::Lost,
        };
        self.console.lock().prompt_taken();
        Ok(input)
    }

    async fn input_loop(&mut self) -> Result<()> {
        loop {
            let prompt = self.prompt_text();
            self.console.lock().prompt(&prompt)?;

            let flow = match self.read_input().await? {
                Input::Line(line) => self.handle_line(&line).await?,
                Input::Closed => {
                    self.manager.disconnect(Some(QUIT_MESSAGE)).await;
                    Flow::Quit
                }
                Input::Lost => Flow::Continue,
            };

            if matches!(flow, Flow::Quit) || !self.manager.is_connected() {
                break;
            }
        }

        info!("session ended");
        self.say("Session ended.")?;
        Ok(())
    }

    fn prompt_text(&self) -> String {
        if let Some(kind) = self.pending {
            kind.question().to_string()
        } else if self.menu.is_active() {
            "Choice: ".to_string()
        } else {
            match self.manager.snapshot().channel {
                Some(channel) => format!("[{}] > ", channel),
                None => "> ".to_string(),
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let text = line.trim();

        if let Some(kind) = self.pending.take() {
            if text.is_empty() {
                self.say("Cancelled.")?;
            } else {
                self.answer(kind, text).await?;
            }
            self.show_menu()?;
            return Ok(Flow::Continue);
        }

        if self.menu.is_active() {
            return self.choose(text).await;
        }

        if text.is_empty() {
            return Ok(Flow::Continue);
        }

        if let Some(command) = text.strip_prefix('/') {
            let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
            match name.to_ascii_lowercase().as_str() {
                "menu" => {
                    self.menu.open();
                    self.show_menu()?;
                }
                "raw" => self.report(self.manager.send_raw(rest))?,
                "quit" => {
                    let reason = rest.trim();
                    let reason = if reason.is_empty() { QUIT_MESSAGE } else { reason };
                    self.manager.disconnect(Some(reason)).await;
                    return Ok(Flow::Quit);
                }
                "help" => self.console.lock().block(HELP)?,
                _ => self.say(&format!("Unknown command: /{}", name))?,
            }
            return Ok(Flow::Continue);
        }

        self.report(self.manager.send_message(text))?;
        Ok(Flow::Continue)
    }

    async fn choose(&mut self, choice: &str) -> Result<Flow> {
        match self.menu.handle(choice) {
            MenuOutcome::Invalid => {
                self.say("Invalid choice.")?;
                self.show_menu()?;
            }
            MenuOutcome::Show(_) => self.show_menu()?,
            MenuOutcome::Prompt(kind) => self.pending = Some(kind),
            MenuOutcome::Perform(action) => {
                self.perform(action).await?;
                self.show_menu()?;
            }
            MenuOutcome::Exit => self.say("Exited menu.")?,
        }
        Ok(Flow::Continue)
    }

    fn show_menu(&mut self) -> Result<()> {
        if self.menu.is_active() {
            let text = self.menu.render();
            self.console.lock().block(&text)?;
        }
        Ok(())
    }

    async fn perform(&mut self, action: MenuAction) -> Result<()> {
        match action {
            MenuAction::LeaveChannel => match self.manager.leave_channel() {
                Ok(Some(channel)) => self.say(&format!("Left {}.", channel))?,
                Ok(None) => self.say(&ClientError::NotInChannel.to_string())?,
                Err(e) => self.say(&e.to_string())?,
            },
            MenuAction::ListChannels => self.report(self.manager.list_channels())?,
            MenuAction::Disconnect => {
                self.manager.disconnect(Some(QUIT_MESSAGE)).await;
                self.menu.close();
                self.say("Disconnected.")?;
            }
            MenuAction::ListIdentities => {
                if self.identities.is_empty() {
                    self.say("No saved identities.")?;
                } else {
                    let names: Vec<&str> = self.identities.names().collect();
                    let listing = format!("Saved identities: {}", names.join(", "));
                    self.say(&listing)?;
                }
            }
        }
        Ok(())
    }

    async fn answer(&mut self, kind: PromptKind, text: &str) -> Result<()> {
        match kind {
            PromptKind::Message => self.report(self.manager.send_message(text))?,
            PromptKind::JoinChannel => self.join(text)?,
            PromptKind::SearchQuery => self.report(self.manager.search_channels(text))?,
            PromptKind::Nickname => self.report(self.manager.change_nickname(text))?,
            PromptKind::Server => match self.config.resolve_server(text) {
                Some(entry) => {
                    let nickname = self.manager.snapshot().nickname;
                    self.reconnect(&entry, &nickname, None).await?;
                }
                None => self.say(&format!("Unknown server: {}", text))?,
            },
            PromptKind::SaveIdentity => self.save_identity(text)?,
            PromptKind::LoadIdentity => match self.identities.load(text) {
                Ok(identity) => {
                    let entry = self.entry_for(&identity);
                    self.reconnect(&entry, &identity.nickname, identity.channel.clone())
                        .await?;
                }
                Err(e) => self.say(&e.to_string())?,
            },
        }
        Ok(())
    }

    fn join(&mut self, channel: &str) -> Result<()> {
        match self.manager.join_channel(channel) {
            Ok(channel) => self.say(&format!("Joining {}...", channel)),
            Err(e) => self.say(&e.to_string()),
        }
    }

    fn save_identity(&mut self, name: &str) -> Result<()> {
        let snapshot = self.manager.snapshot();
        if !snapshot.is_connected() {
            return self.say(&ClientError::NotConnected.to_string());
        }
        self.identities.save(name, Identity::from_connection(&snapshot));
        if let Err(e) = self.identities.persist() {
            warn!("could not write identities: {}", e);
            self.say(&format!("Identity saved for this session only: {}", e))?;
        }
        self.say(&format!("Identity '{}' saved.", name))
    }

    /// Server entry for a saved identity, preferring the directory's TLS setting.
    fn entry_for(&self, identity: &Identity) -> ServerEntry {
        self.config
            .servers
            .iter()
            .find(|s| s.host.eq_ignore_ascii_case(&identity.server) && s.port == identity.port)
            .cloned()
            .unwrap_or_else(|| ServerEntry {
                name: identity.server.clone(),
                host: identity.server.clone(),
                port: identity.port,
                tls: identity.port == 6697,
            })
    }

    async fn reconnect(
        &mut self,
        entry: &ServerEntry,
        nickname: &str,
        channel: Option<String>,
    ) -> Result<()> {
        self.say(&format!("Connecting to {}...", entry))?;
        match self.connect_unless_interrupted(entry, nickname).await {
            Ok(true) => {
                let nickname = self.manager.snapshot().nickname;
                self.say(&format!("Connected as {}.", nickname))?;
                if let Some(channel) = channel {
                    self.join(&channel)?;
                }
            }
            Ok(false) => {
                self.menu.close();
                self.say("Interrupted.")?;
            }
            Err(e) => {
                self.menu.close();
                self.say(&format!("Connection failed: {}", e))?;
            }
        }
        Ok(())
    }

    /// Print the error of a failed operation, if any.
    fn report(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.say(&e.to_string()),
        }
    }

    fn say(&mut self, text: &str) -> Result<()> {
        self.console.lock().line(&format!("*** {}", text))?;
        Ok(())
    }
}

/// Printer task: render events until the manager goes away.
async fn print_events<W: Write>(
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    console: Arc<Mutex<Console<W>>>,
    lost: Arc<Notify>,
) {
    while let Some(event) = events.recv().await {
        let ends = matches!(
            event,
            ClientEvent::Error(_) | ClientEvent::Protocol(ProtocolEvent::Disconnected { .. })
        );
        if let Err(e) = console.lock().event(&event) {
            warn!("console write failed: {}", e);
        }
        if ends {
            lost.notify_one();
        }
    }
}
