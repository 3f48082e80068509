use std::ffi::OsString;
use std::path::{Path, PathBuf};

use wadiff_api::RenderOptions;
use wadiff_tool_api::{ToolError, ToolResult, Viewer};

use crate::command::ExternalCommand;

/// Viewer that runs `RenderOptions::show_command` with the images appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandViewer;

impl Viewer for CommandViewer {
    fn id(&self) -> &'static str {
        "command"
    }

    fn show(&self, images: &[PathBuf], options: &RenderOptions) -> ToolResult<()> {
        if images.is_empty() {
            return Ok(());
        }

        let (program, mut args) = split_show_command(&options.show_command)?;
        let mut sorted = images.to_vec();
        sorted.sort();
        args.extend(sorted.into_iter().map(OsString::from));

        ExternalCommand::new(program).run(&args)?;
        Ok(())
    }
}

/// Split a show command into program and leading arguments.
///
/// Only the final path component is split on whitespace, so a directory
/// containing spaces still names the program correctly.
fn split_show_command(command: &str) -> ToolResult<(PathBuf, Vec<OsString>)> {
    let (dir, base) = match command.rfind('/') {
        Some(index) => (&command[..=index], &command[index + 1..]),
        None => ("", command),
    };
    let mut words = base.split_whitespace();
    let name = words
        .next()
        .ok_or_else(|| ToolError::message(format!("show command '{command}' names no program")))?;
    let program = Path::new(dir).join(name);
    Ok((program, words.map(OsString::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_arguments_from_base_name() {
        let (program, args) = split_show_command("eog --fullscreen").expect("split");
        assert_eq!(program, PathBuf::from("eog"));
        assert_eq!(args, vec![OsString::from("--fullscreen")]);
    }

    #[test]
    fn keeps_spaces_in_directory() {
        let (program, args) =
            split_show_command("/opt/My Tools/viewer -n 2").expect("split");
        assert_eq!(program, PathBuf::from("/opt/My Tools/viewer"));
        assert_eq!(args, vec![OsString::from("-n"), OsString::from("2")]);
    }

    #[test]
    fn blank_command_is_rejected() {
        assert!(split_show_command("  ").is_err());
        assert!(split_show_command("/usr/bin/").is_err());
    }

    #[test]
    fn nothing_to_show_skips_the_viewer() {
        let options = RenderOptions {
            show_command: "wadiff-definitely-missing-program".into(),
            ..RenderOptions::default()
        };
        CommandViewer.show(&[], &options).expect("no images, no viewer");
    }
}
