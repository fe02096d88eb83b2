//! Interactive menu as a table-driven state machine.
//!
//! Each [`MenuState`] owns a static table of entries; a numeric choice
//! indexes into it. The machine performs no I/O: it tells the session
//! what to do through [`MenuOutcome`].

use std::fmt::Write as _;

/// Which menu is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MenuState {
    #[default]
    Main,
    Channel,
    Server,
    Nickname,
    Identity,
}

/// Operations that need no further input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    LeaveChannel,
    ListChannels,
    Disconnect,
    ListIdentities,
}

/// Operations that take the next input line as their argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Message,
    JoinChannel,
    SearchQuery,
    Server,
    Nickname,
    SaveIdentity,
    LoadIdentity,
}

impl PromptKind {
    /// The question shown before reading the argument.
    pub fn question(self) -> &'static str {
        match self {
            PromptKind::Message => "Enter message: ",
            PromptKind::JoinChannel => "Enter channel name: ",
            PromptKind::SearchQuery => "Enter search term: ",
            PromptKind::Server => "Enter server number or host[:port]: ",
            PromptKind::Nickname => "Enter new nickname: ",
            PromptKind::SaveIdentity => "Enter identity name: ",
            PromptKind::LoadIdentity => "Enter identity name to load: ",
        }
    }
}

/// What selecting an entry does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuStep {
    Goto(MenuState),
    Prompt(PromptKind),
    Perform(MenuAction),
    Exit,
}

/// One numbered line of a menu.
#[derive(Clone, Copy, Debug)]
pub struct MenuEntry {
    pub label: &'static str,
    pub step: MenuStep,
}

const fn entry(label: &'static str, step: MenuStep) -> MenuEntry {
    MenuEntry { label, step }
}

const MAIN: &[MenuEntry] = &[
    entry("Channel Navigation", MenuStep::Goto(MenuState::Channel)),
    entry("Server Navigation", MenuStep::Goto(MenuState::Server)),
    entry("Nickname Management", MenuStep::Goto(MenuState::Nickname)),
    entry("Identity Management", MenuStep::Goto(MenuState::Identity)),
    entry("Send Message", MenuStep::Prompt(PromptKind::Message)),
    entry("Disconnect", MenuStep::Perform(MenuAction::Disconnect)),
    entry("Exit Menu", MenuStep::Exit),
];

const CHANNEL: &[MenuEntry] = &[
    entry("Join Channel", MenuStep::Prompt(PromptKind::JoinChannel)),
    entry("Leave Channel", MenuStep::Perform(MenuAction::LeaveChannel)),
    entry("List Channels", MenuStep::Perform(MenuAction::ListChannels)),
    entry("Search Channels", MenuStep::Prompt(PromptKind::SearchQuery)),
    entry("Back", MenuStep::Goto(MenuState::Main)),
];

const SERVER: &[MenuEntry] = &[
    entry("Connect to Server", MenuStep::Prompt(PromptKind::Server)),
    entry("Disconnect", MenuStep::Perform(MenuAction::Disconnect)),
    entry("Back", MenuStep::Goto(MenuState::Main)),
];

const NICKNAME: &[MenuEntry] = &[
    entry("Change Nickname", MenuStep::Prompt(PromptKind::Nickname)),
    entry("Back", MenuStep::Goto(MenuState::Main)),
];

const IDENTITY: &[MenuEntry] = &[
    entry("Save Current Identity", MenuStep::Prompt(PromptKind::SaveIdentity)),
    entry("Load Identity", MenuStep::Prompt(PromptKind::LoadIdentity)),
    entry("List Identities", MenuStep::Perform(MenuAction::ListIdentities)),
    entry("Back", MenuStep::Goto(MenuState::Main)),
];

impl MenuState {
    /// The entry table for this menu.
    pub fn entries(self) -> &'static [MenuEntry] {
        match self {
            MenuState::Main => MAIN,
            MenuState::Channel => CHANNEL,
            MenuState::Server => SERVER,
            MenuState::Nickname => NICKNAME,
            MenuState::Identity => IDENTITY,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MenuState::Main => "Main Menu",
            MenuState::Channel => "Channel Navigation",
            MenuState::Server => "Server Navigation",
            MenuState::Nickname => "Nickname Management",
            MenuState::Identity => "Identity Management",
        }
    }
}

/// Result of feeding one choice to the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuOutcome {
    /// Not a valid choice; state unchanged.
    Invalid,
    /// Moved to another menu.
    Show(MenuState),
    /// Read an argument, then act on it.
    Prompt(PromptKind),
    /// Act immediately.
    Perform(MenuAction),
    /// The menu closed.
    Exit,
}

/// Current menu plus whether it is open.
#[derive(Clone, Debug, Default)]
pub struct MenuStateMachine {
    state: MenuState,
    active: bool,
}

impl MenuStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the menu at Main.
    pub fn open(&mut self) {
        self.state = MenuState::Main;
        self.active = true;
    }

    /// Close the menu without acting.
    pub fn close(&mut self) {
        self.state = MenuState::Main;
        self.active = false;
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply a numeric choice typed by the user.
    pub fn handle(&mut self, choice: &str) -> MenuOutcome {
        let entries = self.state.entries();
        let Some(entry) = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| entries.get(i))
        else {
            return MenuOutcome::Invalid;
        };

        match entry.step {
            MenuStep::Goto(next) => {
                self.state = next;
                MenuOutcome::Show(next)
            }
            MenuStep::Prompt(kind) => MenuOutcome::Prompt(kind),
            MenuStep::Perform(action) => MenuOutcome::Perform(action),
            MenuStep::Exit => {
                self.close();
                MenuOutcome::Exit
            }
        }
    }

    /// The current menu as printable text.
    pub fn render(&self) -> String {
        let mut out = format!("\n=== {} ===\n", self.state.title());
        for (i, entry) in self.state.entries().iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, entry.label);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> MenuStateMachine {
        let mut menu = MenuStateMachine::new();
        menu.open();
        menu
    }

    #[test]
    fn test_main_to_channel() {
        let mut menu = opened();
        assert_eq!(menu.handle("1"), MenuOutcome::Show(MenuState::Channel));
        assert_eq!(menu.state(), MenuState::Channel);
    }

    #[test]
    fn test_invalid_choice_keeps_state() {
        let mut menu = opened();
        for choice in ["0", "8", "abc", "", "-1"] {
            assert_eq!(menu.handle(choice), MenuOutcome::Invalid);
            assert_eq!(menu.state(), MenuState::Main);
        }

        menu.handle("2");
        assert_eq!(menu.handle("4"), MenuOutcome::Invalid);
        assert_eq!(menu.state(), MenuState::Server);
    }

    #[test]
    fn test_back_returns_to_main() {
        let mut menu = opened();
        for (open, back) in [("1", "5"), ("2", "3"), ("3", "2"), ("4", "4")] {
            menu.handle(open);
            assert_eq!(menu.handle(back), MenuOutcome::Show(MenuState::Main));
        }
    }

    #[test]
    fn test_exit_deactivates() {
        let mut menu = opened();
        assert_eq!(menu.handle(" 7 "), MenuOutcome::Exit);
        assert!(!menu.is_active());
    }

    #[test]
    fn test_prompts_and_actions() {
        let mut menu = opened();
        assert_eq!(menu.handle("5"), MenuOutcome::Prompt(PromptKind::Message));
        assert_eq!(
            menu.handle("6"),
            MenuOutcome::Perform(MenuAction::Disconnect)
        );

        menu.handle("1");
        assert_eq!(menu.handle("1"), MenuOutcome::Prompt(PromptKind::JoinChannel));
        assert_eq!(
            menu.handle("3"),
            MenuOutcome::Perform(MenuAction::ListChannels)
        );
        assert_eq!(menu.handle("4"), MenuOutcome::Prompt(PromptKind::SearchQuery));
        assert_eq!(menu.state(), MenuState::Channel);

        menu.handle("5");
        menu.handle("4");
        assert_eq!(
            menu.handle("3"),
            MenuOutcome::Perform(MenuAction::ListIdentities)
        );
    }

    #[test]
    fn test_render_lists_entries() {
        let menu = opened();
        let text = menu.render();
        assert!(text.contains("=== Main Menu ==="));
        assert!(text.contains("1. Channel Navigation"));
        assert!(text.contains("7. Exit Menu"));
    }
}
