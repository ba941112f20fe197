//! Menu forms offered to players.
//!
//! A menu is a list of buttons plus a one-shot callback. The host keeps sent
//! menus on the player until the client answers; answering with a button
//! index runs the callback inside the world the player is in at that time.

use crate::entity::EntityHandle;
use crate::world::Tx;
use std::fmt;

type MenuCallback = Box<dyn FnOnce(&mut Tx<'_>, &EntityHandle, usize) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub image: Option<String>,
}

pub struct Menu {
    title: String,
    content: String,
    buttons: Vec<Button>,
    callback: Option<MenuCallback>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            buttons: Vec::new(),
            callback: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_button(mut self, text: impl Into<String>) -> Self {
        self.buttons.push(Button {
            text: text.into(),
            image: None,
        });
        self
    }

    pub fn with_image_button(mut self, text: impl Into<String>, image: impl Into<String>) -> Self {
        self.buttons.push(Button {
            text: text.into(),
            image: Some(image.into()),
        });
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut Tx<'_>, &EntityHandle, usize) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Answers the menu with the button at `index`.
    ///
    /// Returns false without running the callback when the index does not
    /// name a button (a closed menu or a forged response).
    pub fn submit(self, tx: &mut Tx<'_>, player: &EntityHandle, index: usize) -> bool {
        if index >= self.buttons.len() {
            return false;
        }
        match self.callback {
            Some(callback) => {
                callback(tx, player, index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("title", &self.title)
            .field("content", &self.content)
            .field("buttons", &self.buttons)
            .finish_non_exhaustive()
    }
}
