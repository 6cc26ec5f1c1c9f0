use cliclack::Password;

/// Masked input, used for secrets such as API tokens.
pub struct PromptPassword {
    inner: Password,
}

impl PromptPassword {
    pub fn new(question: &str) -> Self {
        Self {
            inner: Password::new(question).mask('▪'),
        }
    }

    pub fn ask(mut self) -> std::io::Result<String> {
        self.inner.interact()
    }
}
