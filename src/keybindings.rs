//! Customizable keybindings for tool switching, class choice and history.
//!
//! Editing keys (Enter, Escape, arrows, Delete/Backspace) are fixed and
//! handled by the interaction machine; everything here can be rebound
//! through [`crate::config::KeyBindingsConfig`].

use crate::interaction::{Key, Modifiers};
use crate::tools::AnnotationTool;

/// Maximum number of classes that can have hotkeys (0-9 keys).
pub const MAX_CLASS_HOTKEYS: usize = 10;

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Tool(AnnotationTool),
    /// Choose the class at this index for a pending shape
    Class(usize),
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

/// Keybinding configuration for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBindings {
    pub tool_select: Key,
    pub tool_bbox: Key,
    pub tool_polygon: Key,
    pub tool_polyline: Key,
    pub tool_circle_2pt: Key,
    pub tool_circle_3pt: Key,
    pub tool_classification: Key,
    pub tool_no_object: Key,

    /// Hotkeys for class selection (indices 0-9 map to classes 1-10).
    /// None means no hotkey assigned for that slot
    pub class_hotkeys: [Option<Key>; MAX_CLASS_HOTKEYS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            tool_select: Key::Char('s'),
            tool_bbox: Key::Char('b'),
            tool_polygon: Key::Char('p'),
            tool_polyline: Key::Char('l'),
            tool_circle_2pt: Key::Char('c'),
            tool_circle_3pt: Key::Char('o'),
            tool_classification: Key::Char('k'),
            tool_no_object: Key::Char('n'),

            // 1-9 then 0 for classes 1-10
            class_hotkeys: [
                Some(Key::Char('1')),
                Some(Key::Char('2')),
                Some(Key::Char('3')),
                Some(Key::Char('4')),
                Some(Key::Char('5')),
                Some(Key::Char('6')),
                Some(Key::Char('7')),
                Some(Key::Char('8')),
                Some(Key::Char('9')),
                Some(Key::Char('0')),
            ],
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a key press to an action.
    ///
    /// Undo is Ctrl+Z; redo is Ctrl+Shift+Z or Ctrl+Y. With the command
    /// modifier held nothing else matches.
    pub fn action_for(&self, key: Key, modifiers: Modifiers) -> Option<KeyAction> {
        let key = key.normalized();
        if modifiers.command() {
            return match key {
                Key::Char('z') if modifiers.shift => Some(KeyAction::Redo),
                Key::Char('z') => Some(KeyAction::Undo),
                Key::Char('y') => Some(KeyAction::Redo),
                _ => None,
            };
        }
        match key {
            Key::Char('=') | Key::Char('+') => return Some(KeyAction::ZoomIn),
            Key::Char('-') => return Some(KeyAction::ZoomOut),
            Key::Char('f') => return Some(KeyAction::ZoomReset),
            _ => {}
        }
        if let Some(tool) = self.tool_for_key(key) {
            return Some(KeyAction::Tool(tool));
        }
        self.class_index_for_key(key).map(KeyAction::Class)
    }

    /// Get the tool that corresponds to a key press, if any.
    pub fn tool_for_key(&self, key: Key) -> Option<AnnotationTool> {
        AnnotationTool::all()
            .iter()
            .copied()
            .find(|tool| self.key_for_tool(*tool) == key)
    }

    /// Get the class index (0-based) that corresponds to a key press, if any.
    pub fn class_index_for_key(&self, key: Key) -> Option<usize> {
        self.class_hotkeys
            .iter()
            .position(|hotkey| *hotkey == Some(key))
    }

    /// Get the hotkey for a specific tool.
    pub fn key_for_tool(&self, tool: AnnotationTool) -> Key {
        match tool {
            AnnotationTool::Select => self.tool_select,
            AnnotationTool::Bbox => self.tool_bbox,
            AnnotationTool::Polygon => self.tool_polygon,
            AnnotationTool::Polyline => self.tool_polyline,
            AnnotationTool::Circle2Pt => self.tool_circle_2pt,
            AnnotationTool::Circle3Pt => self.tool_circle_3pt,
            AnnotationTool::Classification => self.tool_classification,
            AnnotationTool::NoObject => self.tool_no_object,
        }
    }

    /// Set the hotkey for a tool.
    pub fn set_tool_key(&mut self, tool: AnnotationTool, key: Key) {
        let key = key.normalized();
        match tool {
            AnnotationTool::Select => self.tool_select = key,
            AnnotationTool::Bbox => self.tool_bbox = key,
            AnnotationTool::Polygon => self.tool_polygon = key,
            AnnotationTool::Polyline => self.tool_polyline = key,
            AnnotationTool::Circle2Pt => self.tool_circle_2pt = key,
            AnnotationTool::Circle3Pt => self.tool_circle_3pt = key,
            AnnotationTool::Classification => self.tool_classification = key,
            AnnotationTool::NoObject => self.tool_no_object = key,
        }
    }

    /// Set the hotkey for a class index.
    pub fn set_class_key(&mut self, index: usize, key: Option<Key>) {
        if let Some(slot) = self.class_hotkeys.get_mut(index) {
            *slot = key.map(Key::normalized);
        }
    }

    /// Check if a key is already used by any binding.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, key: Key, exclude_tool: Option<AnnotationTool>) -> Option<String> {
        let key = key.normalized();
        for tool in AnnotationTool::all() {
            if exclude_tool != Some(*tool) && self.key_for_tool(*tool) == key {
                return Some(format!("{} tool", tool.name()));
            }
        }
        self.class_index_for_key(key)
            .map(|i| format!("Class {}", i + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool_hotkeys() {
        let kb = KeyBindings::new();
        let expect = [
            ('s', AnnotationTool::Select),
            ('b', AnnotationTool::Bbox),
            ('p', AnnotationTool::Polygon),
            ('l', AnnotationTool::Polyline),
            ('c', AnnotationTool::Circle2Pt),
            ('o', AnnotationTool::Circle3Pt),
            ('k', AnnotationTool::Classification),
            ('n', AnnotationTool::NoObject),
        ];
        for (c, tool) in expect {
            assert_eq!(
                kb.action_for(Key::Char(c), Modifiers::NONE),
                Some(KeyAction::Tool(tool))
            );
        }
        // Uppercase from a held shift still switches tools
        assert_eq!(
            kb.action_for(Key::Char('B'), Modifiers::shift()),
            Some(KeyAction::Tool(AnnotationTool::Bbox))
        );
    }

    #[test]
    fn test_undo_redo_chords() {
        let kb = KeyBindings::new();
        let ctrl_shift = Modifiers {
            shift: true,
            ..Modifiers::ctrl()
        };
        assert_eq!(kb.action_for(Key::Char('z'), Modifiers::ctrl()), Some(KeyAction::Undo));
        assert_eq!(kb.action_for(Key::Char('z'), ctrl_shift), Some(KeyAction::Redo));
        assert_eq!(kb.action_for(Key::Char('y'), Modifiers::ctrl()), Some(KeyAction::Redo));
        // Ctrl+B is not the bbox tool
        assert_eq!(kb.action_for(Key::Char('b'), Modifiers::ctrl()), None);
    }

    #[test]
    fn test_class_hotkeys() {
        let kb = KeyBindings::new();
        assert_eq!(kb.action_for(Key::Char('1'), Modifiers::NONE), Some(KeyAction::Class(0)));
        assert_eq!(kb.action_for(Key::Char('0'), Modifiers::NONE), Some(KeyAction::Class(9)));
    }

    #[test]
    fn test_key_conflict() {
        let mut kb = KeyBindings::new();
        assert_eq!(kb.key_conflict(Key::Char('p'), None), Some("Polygon tool".to_string()));
        assert_eq!(kb.key_conflict(Key::Char('p'), Some(AnnotationTool::Polygon)), None);
        kb.set_class_key(0, None);
        assert_eq!(kb.key_conflict(Key::Char('1'), None), None);
    }
}
