use {
    rotsink::{Capacity, RotatingSinkBuilder},
    std::io::Write,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = RotatingSinkBuilder::new("./logs/sized.log")
        .capacity(Capacity::KB(64)) // Rotate at 64KB
        .backup_count(5) // Keep sized.log.1 .. sized.log.5
        .file_mode(0o640) // Set file permissions to: owner rw, group r, others none
        .create_dirs(true)
        .build()?;

    // Simulate writing logs that will trigger size-based rotation
    for i in 1..=5000 {
        writeln!(
            logger,
            "Log entry #{}: This is a sample log message that will contribute to file size",
            i
        )?;
    }

    for backup in logger.backups()? {
        println!("{}", backup.display());
    }
    logger.close()?;

    Ok(())
}
