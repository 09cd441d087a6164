//! Per-connection command loop.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Local;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use super::{SessionHandle, SessionId, SessionState};
use crate::protocol::{self, Command, Input};
use crate::registry::Registry;
use crate::Result;

/// Unregisters a session exactly once, on whichever path drops it.
struct Membership {
    registry: Arc<Registry>,
    id: SessionId,
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// One connected client: its protocol state and input interpreter.
///
/// Created by [`Registry::open_session`]. Dropping the session, or letting
/// [`Session::run`] return, removes it from the registry.
pub struct Session {
    handle: Arc<SessionHandle>,
    registry: Arc<Registry>,
    state: SessionState,
    _membership: Membership,
}

impl Session {
    pub(crate) fn new(registry: Arc<Registry>, handle: Arc<SessionHandle>) -> Self {
        let membership = Membership {
            registry: Arc::clone(&registry),
            id: handle.id(),
        };
        Self {
            handle,
            registry,
            state: SessionState::Unidentified,
            _membership: membership,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    /// Claimed nickname, if any.
    pub fn identity(&self) -> Option<String> {
        self.handle.identity()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session until end of stream or a transport failure.
    ///
    /// An empty line counts as end of stream. Protocol and policy problems
    /// are answered in-band and never end the loop; any `Err` returned here
    /// is a transport failure. The session is unregistered on every exit.
    pub async fn run<S>(mut self, lines: S) -> Result<()>
    where
        S: Stream<Item = Result<String>>,
    {
        let lines = std::pin::pin!(lines);
        let result = self.drive(lines).await;
        self.state.transition_to(SessionState::Closed);
        result
    }

    async fn drive<S>(&mut self, mut lines: Pin<&mut S>) -> Result<()>
    where
        S: Stream<Item = Result<String>>,
    {
        self.greet()?;
        while let Some(line) = lines.next().await {
            let line = line?;
            if line.is_empty() {
                break;
            }
            let name = self.identity();
            debug!(
                session = %self.id(),
                name = name.as_deref().unwrap_or("-"),
                "< {}", line
            );
            self.handle_line(&line)?;
        }
        info!(session = %self.id(), "end of stream");
        Ok(())
    }

    /// Send the connect greeting.
    pub fn greet(&self) -> Result<()> {
        for line in protocol::GREETING {
            self.reply(line)?;
        }
        Ok(())
    }

    /// Interpret one inbound line.
    pub fn handle_line(&mut self, line: &str) -> Result<()> {
        match Input::parse(line) {
            Input::Chat(text) => {
                if self.state.can_chat() {
                    self.registry.broadcast_except(&self.handle, &text)?;
                    Ok(())
                } else {
                    self.reply(protocol::IDENTIFY_FIRST)
                }
            }
            Input::Command(command) => self.handle_command(command),
            Input::Invalid => self.reply(protocol::INVALID_COMMAND),
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Name(Some(name)) => self.change_name(name),
            Command::Name(None) => self.reply(protocol::NAME_IN_USE),
            Command::Time => self.reply(protocol::current_time(Local::now().time())),
            Command::Private { .. } | Command::PrivateUsage if !self.state.can_chat() => {
                self.reply(protocol::IDENTIFY_FIRST)
            }
            Command::Private { target, message } => {
                if self.registry.deliver_to(&self.handle, &message, &target)? {
                    Ok(())
                } else {
                    self.reply(protocol::destination_not_found(&target))
                }
            }
            Command::PrivateUsage => self.reply(protocol::PRIVATE_USAGE),
            Command::Commands => {
                for line in protocol::HELP {
                    self.reply(line)?;
                }
                Ok(())
            }
            Command::Unknown(_) => self.reply(protocol::UNKNOWN_COMMAND),
        }
    }

    fn change_name(&mut self, name: String) -> Result<()> {
        if !self.registry.claim_name(&self.handle, &name)? {
            return self.reply(protocol::NAME_IN_USE);
        }

        self.state.transition_to(SessionState::Identified);
        info!(session = %self.id(), name = %name, "nickname claimed");
        self.reply(protocol::nickname_changed(&name))?;
        self.registry
            .broadcast_except(&self.handle, &protocol::joined(&name))?;
        Ok(())
    }

    fn reply(&self, line: impl Into<String>) -> Result<()> {
        self.handle.send(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatRelayError;
    use crate::session::Outbox;
    use futures_util::stream;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(registry: &Arc<Registry>) -> (Session, UnboundedReceiver<String>) {
        let (outbox, rx) = Outbox::channel();
        (registry.open_session(outbox).unwrap(), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn lines(input: &[&str]) -> impl Stream<Item = Result<String>> {
        stream::iter(
            input
                .iter()
                .map(|l| Ok(l.to_string()))
                .collect::<Vec<Result<String>>>(),
        )
    }

    #[test]
    fn test_greeting() {
        let registry = Arc::new(Registry::new());
        let (session, mut rx) = connect(&registry);

        session.greet().unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                "Identify yourself with /name YourName",
                "/commands to show all comands"
            ]
        );
    }

    #[test]
    fn test_chat_before_identifying() {
        let registry = Arc::new(Registry::new());
        let (mut anon, mut rx_anon) = connect(&registry);
        let (mut bob, mut rx_bob) = connect(&registry);
        bob.handle_line("/name bob").unwrap();
        drain(&mut rx_bob);
        assert_eq!(
            drain(&mut rx_anon),
            vec!["[ALL] bob >> bob just joined this chat."]
        );

        anon.handle_line("hello").unwrap();

        assert_eq!(
            drain(&mut rx_anon),
            vec!["Identify yourself before sending a message. Use /name YourName"]
        );
        assert!(drain(&mut rx_bob).is_empty());
    }

    #[test]
    fn test_name_success_announces_join() {
        let registry = Arc::new(Registry::new());
        let (mut alice, mut rx_alice) = connect(&registry);
        let (_bob, mut rx_bob) = connect(&registry);

        alice.handle_line("/name alice").unwrap();

        assert_eq!(alice.state(), SessionState::Identified);
        assert_eq!(
            drain(&mut rx_alice),
            vec!["Successfully changed nickname to alice"]
        );
        assert_eq!(
            drain(&mut rx_bob),
            vec!["[ALL] alice >> alice just joined this chat."]
        );
    }

    #[test]
    fn test_name_in_use() {
        let registry = Arc::new(Registry::new());
        let (mut alice, _rx_alice) = connect(&registry);
        let (mut other, mut rx_other) = connect(&registry);
        alice.handle_line("/name alice").unwrap();
        drain(&mut rx_other);

        other.handle_line("/name alice").unwrap();

        assert_eq!(other.state(), SessionState::Unidentified);
        assert!(other.identity().is_none());
        assert_eq!(
            drain(&mut rx_other),
            vec!["Username in use. Please try again."]
        );
    }

    #[test]
    fn test_name_missing() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);

        session.handle_line("/name").unwrap();

        assert_eq!(drain(&mut rx), vec!["Username in use. Please try again."]);
        assert_eq!(session.state(), SessionState::Unidentified);
    }

    #[test]
    fn test_rename() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);
        session.handle_line("/name alice").unwrap();
        session.handle_line("/name alicia").unwrap();

        assert_eq!(session.identity().as_deref(), Some("alicia"));
        assert!(registry.is_name_available("alice").unwrap());
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn test_time() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);

        session.handle_line("/time").unwrap();

        let reply = drain(&mut rx).pop().unwrap();
        let time = reply.strip_prefix("Current time: ").unwrap();
        assert!(chrono::NaiveTime::parse_from_str(time, "%H:%M:%S").is_ok());
        assert_eq!(time.len(), 8);
    }

    #[test]
    fn test_commands_listing() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);

        session.handle_line("/commands").unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                "/name YourName to change your name",
                "/time to show current time",
                "/private Destination Message to send a private message"
            ]
        );
    }

    #[test]
    fn test_invalid_and_unknown() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);

        session.handle_line("/").unwrap();
        session.handle_line("/private \"open").unwrap();
        session.handle_line("/jump").unwrap();

        assert_eq!(
            drain(&mut rx),
            vec!["Invalid command", "Invalid command", "Unknown command"]
        );
    }

    #[test]
    fn test_private_usage() {
        let registry = Arc::new(Registry::new());
        let (mut session, mut rx) = connect(&registry);
        session.handle_line("/name alice").unwrap();
        drain(&mut rx);

        session.handle_line("/private bob").unwrap();

        assert_eq!(
            drain(&mut rx),
            vec!["Invalid command. Use /private nickname message"]
        );
    }

    #[test]
    fn test_private_requires_identity() {
        let registry = Arc::new(Registry::new());
        let (mut anon, mut rx_anon) = connect(&registry);
        let (mut bob, mut rx_bob) = connect(&registry);
        bob.handle_line("/name bob").unwrap();
        drain(&mut rx_bob);
        drain(&mut rx_anon);

        anon.handle_line("/private bob hi").unwrap();

        assert_eq!(
            drain(&mut rx_anon),
            vec!["Identify yourself before sending a message. Use /name YourName"]
        );
        assert!(drain(&mut rx_bob).is_empty());
    }

    #[test]
    fn test_private_delivery_and_miss() {
        let registry = Arc::new(Registry::new());
        let (mut alice, mut rx_alice) = connect(&registry);
        let (mut bob, mut rx_bob) = connect(&registry);
        alice.handle_line("/name alice").unwrap();
        bob.handle_line("/name bob").unwrap();
        drain(&mut rx_alice);
        drain(&mut rx_bob);

        alice.handle_line("/private bob hi there").unwrap();
        assert_eq!(drain(&mut rx_bob), vec!["[PRIVATE] alice >> hi there"]);
        assert!(drain(&mut rx_alice).is_empty());

        alice.handle_line("/private carol hi").unwrap();
        assert_eq!(
            drain(&mut rx_alice),
            vec!["Destination carol not found. Message not sent"]
        );
    }

    #[tokio::test]
    async fn test_run_unregisters_at_end_of_stream() {
        let registry = Arc::new(Registry::new());
        let (session, mut rx) = connect(&registry);
        let id = session.id();
        assert!(registry.contains(id).unwrap());

        session.run(lines(&["/name alice", "/time"])).await.unwrap();

        assert!(!registry.contains(id).unwrap());
        assert!(registry.is_name_available("alice").unwrap());
        // greeting (2) + name reply + time reply
        assert_eq!(drain(&mut rx).len(), 4);
    }

    #[tokio::test]
    async fn test_run_stops_at_empty_line() {
        let registry = Arc::new(Registry::new());
        let (session, mut rx) = connect(&registry);

        session
            .run(lines(&["/commands", "", "/time"]))
            .await
            .unwrap();

        // greeting (2) + help (3); nothing after the empty line
        assert_eq!(drain(&mut rx).len(), 5);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_run_transport_error_tears_down() {
        let registry = Arc::new(Registry::new());
        let (session, _rx) = connect(&registry);
        let (_bystander, _rx_bystander) = connect(&registry);

        let input = stream::iter(vec![
            Ok("/name alice".to_string()),
            Err(ChatRelayError::WebSocket("reset".into())),
            Ok("never read".to_string()),
        ]);
        let result = session.run(input).await;

        assert!(matches!(result, Err(ChatRelayError::WebSocket(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_run_closed_outbox_tears_down() {
        let registry = Arc::new(Registry::new());
        let (session, rx) = connect(&registry);
        drop(rx);

        let result = session.run(lines(&["/time"])).await;

        assert!(matches!(result, Err(ChatRelayError::ChannelClosed)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let registry = Arc::new(Registry::new());
        let (session, _rx) = connect(&registry);
        assert_eq!(registry.len(), 1);

        drop(session);
        assert!(registry.is_empty());
    }
}
