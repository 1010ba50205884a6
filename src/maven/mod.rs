mod artifact;

pub use artifact::MavenArtifact;

/// Well-known Maven repositories used by the loader ecosystem.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
