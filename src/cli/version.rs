use blindset::crypto::GroupId;

/// Display version information
pub fn execute() {
    println!("blindset {}", env!("CARGO_PKG_VERSION"));
    println!("Commutative encryption for private set intersection");
    let groups: Vec<&str> = GroupId::ALL.iter().map(|g| g.name()).collect();
    println!("Groups: {}", groups.join(", "));
}
