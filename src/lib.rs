use std::env;
use std::str::FromStr;
use std::time::Instant;

use log::{info, warn};
use nalgebra::{Vector3, Vector4};

use crate::camera::Camera;
use crate::lantern::{Lantern, Material, Plane, RenderError, Scene, Sphere};

pub mod camera;
pub mod lantern;
pub mod util;

// 각 채널을 [0, 1]로 자르고 8비트로 바꿔서 (a << 24) | (b << 16) | (g << 8) | r 로 묶음
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;

    (channel(color.w) << 24) | (channel(color.z) << 16) | (channel(color.y) << 8) | channel(color.x)
}

// [r, g, b, a]
pub fn unpack_rgba(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

/// 구 하나, 바닥, 빛나는 구 두 개로 이루어진 기본 씬
pub fn demo_scene() -> Scene {
    let mut scene = Scene::new(Vector3::new(0.6, 0.7, 0.9));

    let sphere = scene.add_material(Material {
        albedo: Vector3::new(1.0, 1.0, 1.0),
        roughness: 0.7,
        ..Default::default()
    });
    let ground = scene.add_material(Material {
        albedo: Vector3::new(0.5, 0.3, 0.2),
        roughness: 1.0,
        ..Default::default()
    });
    let orange_light = scene.add_material(Material {
        albedo: Vector3::new(0.8, 0.5, 0.2),
        roughness: 0.1,
        emission_color: Vector3::new(0.8, 0.5, 0.2),
        emission_power: 2.0,
        ..Default::default()
    });
    let cyan_light = scene.add_material(Material {
        albedo: Vector3::new(0.0, 1.0, 1.0),
        roughness: 0.1,
        emission_color: Vector3::new(0.0, 1.0, 1.0),
        emission_power: 2.0,
        ..Default::default()
    });

    scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, sphere));
    scene.add_shape(Plane::new(Vector3::y(), -1.0, ground));
    scene.add_shape(Sphere::new(Vector3::new(2.0, 0.0, 0.0), 1.0, orange_light));
    scene.add_shape(Sphere::new(Vector3::new(-2.0, 0.0, 0.0), 1.0, cyan_light));

    scene
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            frames: 16,
        }
    }
}

impl RunConfig {
    // LANTERN_WIDTH, LANTERN_HEIGHT, LANTERN_FRAMES 로 기본값을 덮어씀
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            width: env_or("LANTERN_WIDTH", default.width),
            height: env_or("LANTERN_HEIGHT", default.height),
            frames: env_or("LANTERN_FRAMES", default.frames),
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    let Ok(value) = env::var(key) else {
        return default;
    };

    value.trim().parse().unwrap_or_else(|_| {
        warn!("ignoring {key}={value:?}, not a valid number");
        default
    })
}

// 창 없이 기본 씬을 여러 프레임 누적해서 렌더링함
pub fn run() -> Result<(), RenderError> {
    // 로거 초기화
    env_logger::init();

    let config = RunConfig::from_env();
    info!(
        "rendering {} frames at {}x{}",
        config.frames, config.width, config.height
    );

    let scene = demo_scene();
    let mut camera = Camera::new(45.0_f32.to_radians(), 0.1, 100.0, config.width, config.height);
    let mut lantern = Lantern::new(config.width, config.height);

    for _ in 0..config.frames {
        let timer = Instant::now();

        lantern.resize(config.width, config.height);
        camera.resize(config.width, config.height);
        lantern.render(&scene, &camera)?;

        info!(
            "last render: {:.3}ms (accumulated frames: {})",
            timer.elapsed().as_secs_f64() * 1000.0,
            lantern.frame_index() - 1
        );
    }

    Ok(())
}
