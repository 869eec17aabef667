use crate::config::{PIN_MAX_LEN, PIN_MIN_LEN};

pub struct PinPrompt {
    pub title:       String,
    pub description: String,
    pub prompt:      String,
}

/// Prompts for the new PIN and its confirmation.
pub fn new_pin_prompt() -> (PinPrompt, PinPrompt) {
    let entry = PinPrompt {
        title: "pivroot".to_string(),
        description: format!(
            "Resetting PIN. Enter a new PIN of {PIN_MIN_LEN} to {PIN_MAX_LEN} ASCII characters.\n\n\
             It will be required, together with a touch, for every signature."
        ),
        prompt: "New PIN:".to_string(),
    };
    let confirm = PinPrompt {
        title: "pivroot".to_string(),
        description: "Enter the new PIN again to confirm.".to_string(),
        prompt: "Confirm PIN:".to_string(),
    };
    (entry, confirm)
}
