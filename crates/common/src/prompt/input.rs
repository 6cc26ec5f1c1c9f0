use std::str::FromStr;

use cliclack::Input;

pub struct Prompt {
    inner: Input,
}

impl Prompt {
    pub fn new(question: &str) -> Self {
        Self {
            inner: Input::new(question),
        }
    }

    pub fn ask<T>(mut self) -> std::io::Result<T>
    where
        T: FromStr,
    {
        self.inner.interact()
    }
}
