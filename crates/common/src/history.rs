//! Command History - Undo/Redo stack for inspector edits
//!
//! Every value commit and every collection mutation the inspector performs is
//! recorded as one [`PropertyCommand`]. Collection operations record the whole
//! collection value, so a reorder or multi-delete undoes as a single unit.

use bevy::prelude::Resource;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{InspectorError, Result};
use crate::path::FieldPath;
use crate::value::{Instance, InstanceId, Value};

pub const DEFAULT_MAX_HISTORY: usize = 100;
pub const DEFAULT_MERGE_WINDOW_MS: u64 = 300; // Merge edits of one field within 300ms

/// Command for changing the value at one path of one instance
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyCommand {
    pub instance: InstanceId,
    pub path: FieldPath,
    pub old_value: Value,
    pub new_value: Value,
    pub description: String,
}

impl PropertyCommand {
    pub fn new(instance: InstanceId, path: FieldPath, old_value: Value, new_value: Value) -> Self {
        let description = format!("Change {}", path);
        Self { instance, path, old_value, new_value, description }
    }

    /// Same command with a custom history label
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn execute(&self, instances: &mut [Instance]) -> Result<()> {
        self.write(instances, self.new_value.clone())
    }

    pub fn undo(&self, instances: &mut [Instance]) -> Result<()> {
        self.write(instances, self.old_value.clone())
    }

    fn write(&self, instances: &mut [Instance], value: Value) -> Result<()> {
        let instance = instances
            .iter_mut()
            .find(|i| i.id == self.instance)
            .ok_or(InspectorError::UnknownInstance(self.instance))?;

        // Root commands swap the whole object (action and callback snapshots)
        if self.path.is_root() {
            return match value {
                Value::Object(object) => {
                    instance.object = object;
                    Ok(())
                }
                _ => Err(InspectorError::TypeMismatch { path: self.path.clone(), expected: "an object" }),
            };
        }
        instance.object.replace_path(&self.path, value)?;
        Ok(())
    }

    /// Check if this command can be merged with another
    pub fn can_merge(&self, other: &PropertyCommand) -> bool {
        self.instance == other.instance && self.path == other.path
    }

    /// Merge with another command (used for continuous edits like sliders)
    pub fn merge(&mut self, other: PropertyCommand) {
        // Keep old_value from first command, new_value from last command
        self.new_value = other.new_value;
        self.description = format!("Change {} (merged)", self.path);
    }
}

/// Represents any command that can be undone/redone
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Property(PropertyCommand),
    Batch { commands: Vec<PropertyCommand>, description: String },
}

impl Command {
    pub fn execute(&self, instances: &mut [Instance]) -> Result<()> {
        match self {
            Command::Property(cmd) => cmd.execute(instances),
            Command::Batch { commands, .. } => {
                for cmd in commands {
                    cmd.execute(instances)?;
                }
                Ok(())
            }
        }
    }

    pub fn undo(&self, instances: &mut [Instance]) -> Result<()> {
        match self {
            Command::Property(cmd) => cmd.undo(instances),
            Command::Batch { commands, .. } => {
                // Undo in reverse order
                for cmd in commands.iter().rev() {
                    cmd.undo(instances)?;
                }
                Ok(())
            }
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Command::Property(cmd) => &cmd.description,
            Command::Batch { description, .. } => description,
        }
    }

    fn can_merge_property(&self, other: &PropertyCommand) -> bool {
        match self {
            Command::Property(cmd) => cmd.can_merge(other),
            Command::Batch { .. } => false,
        }
    }

    fn merge_property(&mut self, other: PropertyCommand) {
        if let Command::Property(cmd) = self {
            cmd.merge(other);
        }
    }
}

/// Undo log the renderer records already-applied mutations into
pub trait UndoLog {
    fn record(&mut self, command: Command);
}

/// Command history with undo/redo stack
#[derive(Resource)]
pub struct CommandHistory {
    stack: Vec<Command>,
    current_index: usize,
    last_command_time: Option<Instant>,
    max_history: usize,
    merge_window: Duration,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY, Duration::from_millis(DEFAULT_MERGE_WINDOW_MS))
    }
}

impl CommandHistory {
    pub fn new(max_history: usize, merge_window: Duration) -> Self {
        Self {
            stack: Vec::new(),
            current_index: 0,
            last_command_time: None,
            max_history: max_history.max(1),
            merge_window,
        }
    }

    /// Execute and push a new command
    pub fn execute(&mut self, command: Command, instances: &mut [Instance]) -> Result<()> {
        command.execute(instances)?;
        self.push(command);
        Ok(())
    }

    fn push(&mut self, command: Command) {
        // Try to merge with previous command if within merge window
        let now = Instant::now();
        let should_merge = match self.last_command_time {
            Some(last_time) => now.duration_since(last_time) < self.merge_window && self.current_index > 0,
            None => false,
        };

        if should_merge {
            if let Command::Property(ref prop_cmd) = command {
                if let Some(last_cmd) = self.stack.get_mut(self.current_index - 1) {
                    if last_cmd.can_merge_property(prop_cmd) {
                        last_cmd.merge_property(prop_cmd.clone());
                        self.last_command_time = Some(now);
                        return;
                    }
                }
            }
        }

        // Clear any redo history
        self.stack.truncate(self.current_index);

        debug!("History: {}", command.description());
        self.stack.push(command);
        self.current_index += 1;
        self.last_command_time = Some(now);

        // Limit history size
        if self.stack.len() > self.max_history {
            self.stack.remove(0);
            self.current_index -= 1;
        }
    }

    /// Undo the last command
    pub fn undo(&mut self, instances: &mut [Instance]) -> Result<()> {
        if !self.can_undo() {
            return Err(InspectorError::NothingToUndo);
        }

        self.current_index -= 1;
        let command = &self.stack[self.current_index];
        command.undo(instances)?;

        // Reset merge window
        self.last_command_time = None;

        Ok(())
    }

    /// Redo the next command
    pub fn redo(&mut self, instances: &mut [Instance]) -> Result<()> {
        if !self.can_redo() {
            return Err(InspectorError::NothingToRedo);
        }

        let command = &self.stack[self.current_index];
        command.execute(instances)?;
        self.current_index += 1;

        self.last_command_time = None;

        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index < self.stack.len()
    }

    /// Get description of command that would be undone
    pub fn undo_description(&self) -> Option<&str> {
        if self.can_undo() {
            Some(self.stack[self.current_index - 1].description())
        } else {
            None
        }
    }

    /// Get description of command that would be redone
    pub fn redo_description(&self) -> Option<&str> {
        if self.can_redo() {
            Some(self.stack[self.current_index].description())
        } else {
            None
        }
    }

    /// All commands for display in a history panel: (index, description, applied)
    pub fn get_history(&self) -> Vec<(usize, &str, bool)> {
        self.stack
            .iter()
            .enumerate()
            .map(|(i, cmd)| (i, cmd.description(), i < self.current_index))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.current_index = 0;
        self.last_command_time = None;
    }

    /// Jump to a specific point in history
    pub fn jump_to(&mut self, index: usize, instances: &mut [Instance]) -> Result<()> {
        if index > self.stack.len() {
            return Err(InspectorError::InvalidHistoryIndex(index));
        }

        while self.current_index > index {
            self.undo(instances)?;
        }
        while self.current_index < index {
            self.redo(instances)?;
        }

        Ok(())
    }
}

impl UndoLog for CommandHistory {
    fn record(&mut self, command: Command) {
        self.push(command);
    }
}
