use regex::Regex;

/// Commit message split into the parts release tooling cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: String,
    pub change_id: Option<String>,
}

impl CommitMessage {
    /// Parse the raw message text (`git log -1 --format=%B`)
    ///
    /// Only a `Change-Id:` trailer in the last paragraph counts; review
    /// tooling ignores ids quoted earlier in the body.
    pub fn parse(message: &str) -> Self {
        let message = message.trim_end();
        let (subject, body) = match message.split_once('\n') {
            Some((subject, rest)) => (subject.trim().to_string(), rest.trim().to_string()),
            None => (message.trim().to_string(), String::new()),
        };

        let footer = body.rsplit("\n\n").next().unwrap_or_default();
        let change_id = Regex::new(r"(?m)^Change-Id:\s*(I[0-9a-fA-F]{7,40})\s*$")
            .ok()
            .and_then(|re| {
                re.captures_iter(footer)
                    .last()
                    .and_then(|captures| captures.get(1))
                    .map(|m| m.as_str().to_string())
            });

        CommitMessage {
            subject,
            body,
            change_id,
        }
    }

    /// Message text suitable for `git commit -F`
    pub fn text(&self) -> String {
        if self.body.is_empty() {
            format!("{}\n", self.subject)
        } else {
            format!("{}\n\n{}\n", self.subject, self.body)
        }
    }
}
