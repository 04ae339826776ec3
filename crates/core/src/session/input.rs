/// Single-line text field that only edits at its end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    char_limit: usize,
}

impl TextInput {
    pub fn new(char_limit: usize) -> Self {
        Self {
            value: String::new(),
            char_limit,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Appends `c` unless it is a control character or the field is full.
    pub fn insert(&mut self, c: char) -> bool {
        if c.is_control() || self.value.chars().count() >= self.char_limit {
            return false;
        }
        self.value.push(c);
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.value.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Empties the field and returns what it held.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.value)
    }
}
