use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::settings::KeybindingsConfig;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum KeyContext {
    Global,
    Board,
    Form,
}

impl KeyContext {
    const ALL: [KeyContext; 3] = [KeyContext::Global, KeyContext::Board, KeyContext::Form];
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum KeyAction {
    Quit,
    FocusNext,
    FocusPrev,
    SelectNext,
    SelectPrev,
    MoveForward,
    MoveBackward,
    DeleteTask,
    NewTask,
    EditTask,
    Reload,
    SubmitField,
    EraseChar,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    fn matches(&self, key: KeyEvent) -> bool {
        match (&self.code, key.code) {
            (KeyCode::Char(left), KeyCode::Char(right)) => {
                normalize_char(*left, self.modifiers) == normalize_char(right, key.modifiers)
                    && normalize_modifiers(self.modifiers) == normalize_modifiers(key.modifiers)
            }
            _ => self.code == key.code && self.modifiers == key.modifiers,
        }
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }

        parts.push(match self.code {
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::Backspace => "Backspace".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Delete => "Delete".to_string(),
            KeyCode::F(n) => format!("F{n}"),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(ch) => ch.to_string(),
            _ => "?".to_string(),
        });

        write!(f, "{}", parts.join("+"))
    }
}

#[derive(Debug, Clone)]
pub struct ActionBinding {
    pub id: &'static str,
    pub action: KeyAction,
    pub description: &'static str,
    pub bindings: Vec<KeyBinding>,
}

/// Resolved key map for every input context.
#[derive(Debug, Clone)]
pub struct Keybindings {
    global: Vec<ActionBinding>,
    board: Vec<ActionBinding>,
    form: Vec<ActionBinding>,
}

struct ActionDef {
    id: &'static str,
    action: KeyAction,
    description: &'static str,
    defaults: &'static [&'static str],
}

const GLOBAL_DEFS: &[ActionDef] = &[ActionDef {
    id: "quit",
    action: KeyAction::Quit,
    description: "quit",
    defaults: &["Ctrl+C"],
}];

const BOARD_DEFS: &[ActionDef] = &[
    ActionDef {
        id: "quit",
        action: KeyAction::Quit,
        description: "quit",
        defaults: &["q"],
    },
    ActionDef {
        id: "focus_next",
        action: KeyAction::FocusNext,
        description: "next column",
        defaults: &["l", "Right"],
    },
    ActionDef {
        id: "focus_prev",
        action: KeyAction::FocusPrev,
        description: "previous column",
        defaults: &["h", "Left"],
    },
    ActionDef {
        id: "select_next",
        action: KeyAction::SelectNext,
        description: "next task",
        defaults: &["j", "Down"],
    },
    ActionDef {
        id: "select_prev",
        action: KeyAction::SelectPrev,
        description: "previous task",
        defaults: &["k", "Up"],
    },
    ActionDef {
        id: "move_forward",
        action: KeyAction::MoveForward,
        description: "advance task",
        defaults: &["Enter"],
    },
    ActionDef {
        id: "move_backward",
        action: KeyAction::MoveBackward,
        description: "send task back",
        defaults: &["Backspace"],
    },
    ActionDef {
        id: "delete_task",
        action: KeyAction::DeleteTask,
        description: "delete",
        defaults: &["d"],
    },
    ActionDef {
        id: "new_task",
        action: KeyAction::NewTask,
        description: "new",
        defaults: &["n"],
    },
    ActionDef {
        id: "edit_task",
        action: KeyAction::EditTask,
        description: "edit",
        defaults: &["e"],
    },
    ActionDef {
        id: "reload",
        action: KeyAction::Reload,
        description: "reload",
        defaults: &["r"],
    },
];

const FORM_DEFS: &[ActionDef] = &[
    ActionDef {
        id: "submit_field",
        action: KeyAction::SubmitField,
        description: "next field / save",
        defaults: &["Enter"],
    },
    ActionDef {
        id: "erase_char",
        action: KeyAction::EraseChar,
        description: "erase",
        defaults: &["Backspace"],
    },
];

impl Default for Keybindings {
    fn default() -> Self {
        Self::from_config(&KeybindingsConfig::default())
    }
}

impl Keybindings {
    pub fn from_config(config: &KeybindingsConfig) -> Self {
        let keybindings = Self {
            global: build_section(KeyContext::Global, GLOBAL_DEFS, &config.global),
            board: build_section(KeyContext::Board, BOARD_DEFS, &config.board),
            form: build_section(KeyContext::Form, FORM_DEFS, &config.form),
        };

        keybindings.validate_conflicts();
        keybindings
    }

    /// Resolves `key` in `context`, falling back to the global section.
    pub fn action_for_key(&self, context: KeyContext, key: KeyEvent) -> Option<KeyAction> {
        find_action(&self.global, key).or_else(|| match context {
            KeyContext::Global => None,
            _ => find_action(self.bindings_for(context), key),
        })
    }

    /// Footer hints for `context`, e.g. `n new`.
    pub fn hints(&self, context: KeyContext) -> Vec<String> {
        self.bindings_for(context)
            .iter()
            .filter_map(|binding| {
                let first = binding.bindings.first()?;
                Some(format!("{first} {}", binding.description))
            })
            .collect()
    }

    pub fn display_for(&self, context: KeyContext, action: KeyAction) -> Option<String> {
        self.bindings_for(context)
            .iter()
            .find(|binding| binding.action == action)
            .map(|binding| {
                binding
                    .bindings
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" / ")
            })
    }

    fn bindings_for(&self, context: KeyContext) -> &[ActionBinding] {
        match context {
            KeyContext::Global => &self.global,
            KeyContext::Board => &self.board,
            KeyContext::Form => &self.form,
        }
    }

    fn validate_conflicts(&self) {
        for context in KeyContext::ALL {
            let mut seen: HashMap<String, &'static str> = HashMap::new();
            for binding in self.bindings_for(context) {
                for key in &binding.bindings {
                    let key_name = key.to_string();
                    if let Some(first_action) = seen.get(&key_name) {
                        warn!(
                            "keybinding conflict in {:?}: '{}' used by '{}' and '{}' (first wins)",
                            context, key_name, first_action, binding.id
                        );
                    } else {
                        seen.insert(key_name, binding.id);
                    }
                }
            }
        }
    }
}

fn find_action(bindings: &[ActionBinding], key: KeyEvent) -> Option<KeyAction> {
    bindings
        .iter()
        .find(|binding| binding.bindings.iter().any(|candidate| candidate.matches(key)))
        .map(|binding| binding.action)
}

fn build_section(
    context: KeyContext,
    defs: &[ActionDef],
    overrides: &HashMap<String, Vec<String>>,
) -> Vec<ActionBinding> {
    for id in overrides.keys() {
        if !defs.iter().any(|def| def.id == id) {
            warn!("unknown keybinding action '{}' in {:?}; ignoring", id, context);
        }
    }

    defs.iter()
        .map(|def| {
            let mut parsed: Vec<KeyBinding> = match overrides.get(def.id) {
                Some(raw_bindings) => raw_bindings
                    .iter()
                    .filter_map(|raw| {
                        let binding = parse_binding(raw);
                        if binding.is_none() {
                            warn!(
                                "invalid keybinding '{}' for action '{}' in {:?}; ignoring",
                                raw, def.id, context
                            );
                        }
                        binding
                    })
                    .collect(),
                None => Vec::new(),
            };

            if parsed.is_empty() {
                if overrides.contains_key(def.id) {
                    warn!(
                        "no valid keybindings for action '{}' in {:?}; falling back to defaults",
                        def.id, context
                    );
                }
                parsed = def
                    .defaults
                    .iter()
                    .filter_map(|raw| parse_binding(raw))
                    .collect();
            }

            ActionBinding {
                id: def.id,
                action: def.action,
                description: def.description,
                bindings: parsed,
            }
        })
        .collect()
}

fn normalize_modifiers(mut modifiers: KeyModifiers) -> KeyModifiers {
    modifiers.remove(KeyModifiers::SHIFT);
    modifiers
}

fn normalize_char(ch: char, modifiers: KeyModifiers) -> char {
    if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        ch.to_ascii_lowercase()
    } else {
        ch
    }
}

pub fn parse_binding(raw: &str) -> Option<KeyBinding> {
    let mut modifiers = KeyModifiers::empty();
    let mut key: Option<&str> = None;

    for part in raw.split('+').map(str::trim).filter(|s| !s.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            _ => {
                if key.is_some() {
                    return None;
                }
                key = Some(part);
            }
        }
    }

    let key = key?;
    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "delete" | "del" => KeyCode::Delete,
        "space" => KeyCode::Char(' '),
        _ if lower.starts_with('f') && (2..=3).contains(&lower.len()) => {
            KeyCode::F(lower[1..].parse::<u8>().ok()?)
        }
        _ if key.chars().count() == 1 => KeyCode::Char(normalize_char(key.chars().next()?, modifiers)),
        _ => return None,
    };

    Some(KeyBinding { code, modifiers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn parse_ctrl_binding() {
        let binding = parse_binding("Ctrl+C").expect("binding");
        assert_eq!(binding.code, KeyCode::Char('c'));
        assert!(binding.modifiers.contains(KeyModifiers::CONTROL));
        assert_eq!(binding.to_string(), "Ctrl+c");
    }

    #[test]
    fn parse_named_keys() {
        assert_eq!(parse_binding("Backspace").map(|b| b.code), Some(KeyCode::Backspace));
        assert_eq!(parse_binding("enter").map(|b| b.code), Some(KeyCode::Enter));
        assert_eq!(parse_binding("F5").map(|b| b.code), Some(KeyCode::F(5)));
        assert_eq!(parse_binding("Space").map(|b| b.code), Some(KeyCode::Char(' ')));
    }

    #[test]
    fn invalid_binding_returns_none() {
        assert!(parse_binding("Ctrl+Left+Right").is_none());
        assert!(parse_binding("Hyper").is_none());
        assert!(parse_binding("").is_none());
    }

    #[test]
    fn shifted_alpha_is_distinct() {
        let upper = parse_binding("D").expect("binding");
        assert!(upper.matches(KeyEvent::new(KeyCode::Char('D'), KeyModifiers::SHIFT)));
        assert!(!upper.matches(key(KeyCode::Char('d'))));
    }

    #[test]
    fn board_defaults_resolve_actions() {
        let keys = Keybindings::default();
        let cases = [
            (KeyCode::Char('q'), KeyAction::Quit),
            (KeyCode::Char('l'), KeyAction::FocusNext),
            (KeyCode::Right, KeyAction::FocusNext),
            (KeyCode::Char('h'), KeyAction::FocusPrev),
            (KeyCode::Down, KeyAction::SelectNext),
            (KeyCode::Char('k'), KeyAction::SelectPrev),
            (KeyCode::Enter, KeyAction::MoveForward),
            (KeyCode::Backspace, KeyAction::MoveBackward),
            (KeyCode::Char('d'), KeyAction::DeleteTask),
            (KeyCode::Char('n'), KeyAction::NewTask),
            (KeyCode::Char('e'), KeyAction::EditTask),
            (KeyCode::Char('r'), KeyAction::Reload),
        ];
        for (code, expected) in cases {
            assert_eq!(
                keys.action_for_key(KeyContext::Board, key(code)),
                Some(expected),
                "{code:?}"
            );
        }
    }

    #[test]
    fn form_context_leaves_letters_unbound() {
        let keys = Keybindings::default();
        assert_eq!(keys.action_for_key(KeyContext::Form, key(KeyCode::Char('q'))), None);
        assert_eq!(
            keys.action_for_key(KeyContext::Form, key(KeyCode::Enter)),
            Some(KeyAction::SubmitField)
        );
        assert_eq!(
            keys.action_for_key(
                KeyContext::Form,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            Some(KeyAction::Quit)
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut config = KeybindingsConfig::default();
        config
            .board
            .insert("delete_task".to_string(), vec!["x".to_string()]);
        config
            .board
            .insert("reload".to_string(), vec!["NotAKey".to_string()]);
        let keys = Keybindings::from_config(&config);

        assert_eq!(
            keys.action_for_key(KeyContext::Board, key(KeyCode::Char('x'))),
            Some(KeyAction::DeleteTask)
        );
        assert_eq!(keys.action_for_key(KeyContext::Board, key(KeyCode::Char('d'))), None);
        assert_eq!(
            keys.action_for_key(KeyContext::Board, key(KeyCode::Char('r'))),
            Some(KeyAction::Reload)
        );
    }

    #[test]
    fn conflicting_override_keeps_first_action() {
        let mut config = KeybindingsConfig::default();
        config
            .board
            .insert("reload".to_string(), vec!["n".to_string()]);
        let keys = Keybindings::from_config(&config);

        assert_eq!(
            keys.action_for_key(KeyContext::Board, key(KeyCode::Char('n'))),
            Some(KeyAction::NewTask)
        );
    }

    #[test]
    fn hints_use_first_binding() {
        let keys = Keybindings::default();
        let hints = keys.hints(KeyContext::Board);
        assert!(hints.contains(&"n new".to_string()));
        assert_eq!(
            keys.display_for(KeyContext::Board, KeyAction::FocusNext).as_deref(),
            Some("l / Right")
        );
    }
}
