/*!
Batch framing.

Wire form (batch mode on):

  <cmd1><command_delimiter><cmd2>...<cmdN><batch_delimiter>

  - exactly one batch delimiter, at the very end
  - the batch delimiter may appear in the body only as part of a command
    delimiter (`|` framing `a||b|` with `||` between commands)
  - empty (or blank) commands between delimiters are dropped

With batch mode off the whole string is one command.
*/

use crate::config::ProcessorOptions;
use crate::error::{Result, invalid_configuration, invalid_request};
use crate::text::TextHandler;

/// Validate `raw` and split it into the commands it carries, in order.
pub fn split_batch(raw: &str, options: &ProcessorOptions, text: &TextHandler) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Err(invalid_request("The request cannot be empty.", &[]));
    }

    let body = if options.batch_enabled {
        let framing_error = || {
            invalid_request(
                "The batch must have a single delimiter at the end.",
                &[("delimiter", &options.batch_delimiter)],
            )
        };
        let body = raw
            .strip_suffix(options.batch_delimiter.as_str())
            .ok_or_else(framing_error)?;
        if body
            .split(options.command_delimiter.as_str())
            .any(|command| command.contains(options.batch_delimiter.as_str()))
        {
            return Err(framing_error());
        }
        Some(body)
    } else {
        None
    };

    let length = text.len(raw);
    if length > options.max_length {
        let length = length.to_string();
        let max = options.max_length.to_string();
        return Err(invalid_configuration(
            "The request length exceeds the configured maximum.",
            &[("length", &length), ("max", &max)],
        ));
    }

    let Some(body) = body else {
        return Ok(vec![raw.to_string()]);
    };

    let commands: Vec<String> = body
        .split(options.command_delimiter.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .collect();
    if commands.is_empty() {
        return Err(invalid_request(
            "The batch does not contain any command.",
            &[],
        ));
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn batch(batch: &str, command: &str) -> ProcessorOptions {
        ProcessorOptions::default().with_batch(batch, command)
    }

    fn split(raw: &str, options: &ProcessorOptions) -> Result<Vec<String>> {
        split_batch(raw, options, &TextHandler::default())
    }

    #[test]
    fn single_command_with_trailing_delimiter() {
        let commands = split("command1|", &batch("|", ";")).unwrap();
        assert_eq!(commands, vec!["command1"]);
    }

    #[test]
    fn missing_trailing_delimiter() {
        let err = split("command1", &batch("|", ";")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(
            err.to_string(),
            "The batch must have a single delimiter at the end. delimiter=|"
        );
    }

    #[test]
    fn batch_delimiter_inside_body() {
        let err = split("a|b|", &batch("|", ";")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn command_delimiter_containing_batch_delimiter() {
        let options = batch("|", "||");
        assert_eq!(split("a||b|", &options).unwrap(), vec!["a", "b"]);
        assert_eq!(split("a|", &options).unwrap(), vec!["a"]);

        let err = split("a|b|", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn empty_commands_are_dropped() {
        let commands = split(";a;;  ;b c;|", &batch("|", ";")).unwrap();
        assert_eq!(commands, vec!["a", "b c"]);
    }

    #[test]
    fn same_delimiter_for_batch_and_command() {
        let commands = split("cmd1|cmd2|", &batch("|", "|")).unwrap();
        assert_eq!(commands, vec!["cmd1", "cmd2"]);
    }

    #[test]
    fn batch_without_commands() {
        let err = split(";;|", &batch("|", ";")).unwrap_err();
        assert_eq!(err.to_string(), "The batch does not contain any command.");
    }

    #[test]
    fn empty_request() {
        let err = split("   ", &ProcessorOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "The request cannot be empty.");
    }

    #[test]
    fn length_limit() {
        let options = ProcessorOptions::default().with_max_length(5);
        let err = split("root1 grp1", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(
            err.to_string(),
            "The request length exceeds the configured maximum. length=10 max=5"
        );
    }

    #[test]
    fn batch_mode_off_keeps_delimiters() {
        let commands = split("a;b|", &ProcessorOptions::default()).unwrap();
        assert_eq!(commands, vec!["a;b|"]);
    }
}
