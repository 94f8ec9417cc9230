fn main() -> anyhow::Result<()> {
    let doc = motionify_portal::docs::build_openapi();
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
