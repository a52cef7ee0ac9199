//! Scan command - preview what a watch would register.

use crate::watcher::path_filter::valid_directory;
use crate::watcher::scanner::executables_in;

/// Print the executables directly inside each valid directory.
pub fn run(directories: &[String]) -> anyhow::Result<()> {
    let mut total = 0;

    for candidate in directories {
        let Some(dir) = valid_directory(candidate) else {
            eprintln!("Skipping {candidate:?}: not an existing directory");
            continue;
        };

        let executables = executables_in(&dir);
        println!("{} ({} executables)", dir.display(), executables.len());
        for executable in &executables {
            println!("  {}", executable.display());
        }
        total += executables.len();
    }

    println!("Found {total} executables");
    Ok(())
}
