use rotsink::RotatingSink;

// Run it a few times: capacity accounting picks up where the previous run
// left off, so rotation happens at the same byte offset across restarts.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("./logs")?;
    let mut sink = RotatingSink::open("./logs/restart.log", 2, 100)?;
    println!(
        "resuming with {} bytes used, last written {}",
        sink.bytes_used(),
        sink.last_write_time()
    );

    sink.write(b"one run of the demo wrote this line\n")?;
    println!("now {} bytes used, backups: {:?}", sink.bytes_used(), sink.backups()?);
    sink.close()?;

    Ok(())
}
