use std::path::Path;
use std::process::ExitCode;

use retained_scene::asset::HeadlessGpu;
use retained_scene::io::FileSource;
use retained_scene::{init_logging, ImportSettings, Scene, SceneLoader};

fn usage() -> ExitCode {
    eprintln!("usage: scene-inspect <file.gltf|file.glb> [settings.json]");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        return usage();
    };
    let settings = match args.next() {
        Some(settings) => ImportSettings::load_from_path(settings),
        None => ImportSettings::default(),
    };

    let path = Path::new(&path);
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return usage();
    };

    let source = FileSource::new(base);
    let mut gpu = HeadlessGpu::new();
    let mut scene = Scene::new();

    let imported = match SceneLoader::new(&source, &mut gpu)
        .with_settings(settings)
        .load_gltf(&mut scene, file_name)
    {
        Ok(imported) => imported,
        Err(err) => {
            log::error!("Failed to import {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    println!("entities: {}", imported.entities.len());
    println!("pruned:   {}", imported.pruned.len());
    println!("buffers:  {}", gpu.buffer_count());
    println!("textures: {}", gpu.texture_count());
    println!();
    print!("{}", scene.describe_hierarchy(imported.root));
    ExitCode::SUCCESS
}
