use std::f32::consts::PI;

use log::{debug, trace, warn};
use nalgebra::{Point3, Vector3, Vector4};
use rayon::prelude::*;

use crate::util::random_unit_vec;
use crate::vec4_to_rgba;

pub use error::{RenderError, SceneError};
pub use image::Image;
pub use ray::Ray;
pub use scene::{Material, Scene};
pub use shape::{HitPayload, Intersect, Plane, Shape, Sphere, MISS};

mod error;
mod image;
mod ray;
pub mod scene;
pub mod shape;

// 광선이 방금 맞은 면에 다시 맞지 않도록 법선 방향으로 살짝 띄움
const RAY_EPSILON: f32 = 1e-4;

/// 렌더러가 카메라에게 필요로 하는 것. 위치와 픽셀마다의 광선 방향(x + y * width 순서)
pub trait CameraView {
    fn position(&self) -> Point3<f32>;
    fn ray_directions(&self) -> &[Vector3<f32>];
}

pub struct Settings {
    pub should_accumulate: bool,
    pub bounce_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            should_accumulate: true,
            bounce_limit: 15,
        }
    }
}

pub struct Lantern {
    final_image: Image,
    final_image_data: Vec<u32>,
    path_acc: Vec<Vector4<f32>>,
    acc_counter: u32,
    pub settings: Settings,
}

impl Lantern {
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = (width as usize) * (height as usize);

        Self {
            final_image: Image::new(width, height),
            final_image_data: vec![0; pixels],
            path_acc: vec![Vector4::zeros(); pixels],
            acc_counter: 1,
            settings: Default::default(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.final_image.size() == (width, height) {
            return;
        }

        debug!("resizing render buffers to {width}x{height}");

        let pixels = (width as usize) * (height as usize);
        self.final_image.resize(width, height);
        self.final_image_data = vec![0; pixels];
        self.path_acc = vec![Vector4::zeros(); pixels];

        // 새 버퍼엔 누적된게 없으니 처음부터
        self.acc_counter = 1;
    }

    pub fn render(&mut self, scene: &Scene, camera: &impl CameraView) -> Result<(), RenderError> {
        let (width, height) = self.final_image.size();
        let expected = (width as usize) * (height as usize);

        if let Err(error) = scene.validate() {
            warn!("skipping frame: {error}");
            return Err(error.into());
        }

        let rays = camera.ray_directions();
        if rays.len() != expected {
            warn!(
                "skipping frame: camera has {} rays for a {width}x{height} viewport",
                rays.len()
            );
            return Err(RenderError::ViewportMismatch {
                expected,
                actual: rays.len(),
            });
        }

        if self.acc_counter == 1 {
            debug!("starting a new accumulation");
            self.path_acc.fill(Vector4::zeros());
        }

        let context = RenderContext {
            scene,
            origin: camera.position(),
            rays,
            frame_index: self.acc_counter,
            bounce_limit: self.settings.bounce_limit,
        };
        let frame_index = self.acc_counter as f32;

        if width > 0 {
            let width = width as usize;

            // 픽셀 i는 path_acc[i]와 final_image_data[i]만 건드리니 잠글 필요가 없음
            self.path_acc
                .par_chunks_mut(width)
                .zip(self.final_image_data.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (path_row, image_row))| {
                    for (x, (path, pixel)) in path_row.iter_mut().zip(image_row).enumerate() {
                        let color = context.per_pixel(x + y * width);

                        *path += color;
                        let accumulated = *path / frame_index;

                        *pixel = vec4_to_rgba(&accumulated);
                    }
                });
        }

        self.final_image.set_data(&self.final_image_data);
        trace!("rendered frame {} ({width}x{height})", self.acc_counter);

        if self.settings.should_accumulate {
            self.acc_counter += 1;
        } else {
            self.acc_counter = 1;
        }

        Ok(())
    }

    // 씬이나 카메라가 바뀌었는지는 렌더러가 알 수 없으니 호출하는 쪽에서 불러줘야 함
    pub fn reset_frame_index(&mut self) {
        self.acc_counter = 1;
    }

    pub fn frame_index(&self) -> u32 {
        self.acc_counter
    }

    pub fn final_image(&self) -> &Image {
        &self.final_image
    }

    // 지금까지 더한 값 그대로. 각 원소의 w가 더해진 프레임 수라서 xyz / w 가 평균
    pub fn accumulation(&self) -> &[Vector4<f32>] {
        &self.path_acc
    }
}

// render 한 번 동안만 빌려오는 씬과 카메라
struct RenderContext<'a> {
    scene: &'a Scene,
    origin: Point3<f32>,
    rays: &'a [Vector3<f32>],
    frame_index: u32,
    bounce_limit: u32,
}

impl RenderContext<'_> {
    // DirectX의 RayGen 쉐이더와 같음
    fn per_pixel(&self, index: usize) -> Vector4<f32> {
        let ray = Ray::new(self.origin, self.rays[index]);
        let seed = (index as u32).wrapping_mul(self.frame_index);

        let light = self.trace_path(ray, seed);
        Vector4::new(light.x, light.y, light.z, 1.0)
    }

    fn trace_path(&self, mut ray: Ray, mut seed: u32) -> Vector3<f32> {
        let mut light = Vector3::zeros();
        let mut throughput = Vector3::repeat(1.0);

        for bounce in 0..self.bounce_limit {
            seed = seed.wrapping_add(bounce);

            let Some(hit) = self.trace_ray(&ray) else {
                light += self.scene.sky_color.component_mul(&throughput);
                break;
            };

            // validate를 통과했으니 항상 있음
            let Some(material) = self.scene.materials.get(hit.material_index) else {
                break;
            };

            if material.emission_power > 0.0 {
                light += material.emission().component_mul(&throughput);
            }

            // Fresnel-Schlick. 비스듬히 볼수록 거울처럼 반사함
            let view = -ray.direction;
            let fresnel = material.metallic
                + (1.0 - material.metallic) * (1.0 - view.dot(&hit.normal)).powi(5);

            let reflected = reflect(&ray.direction, &hit.normal);
            let scattered = (hit.normal + random_unit_vec(&mut seed))
                .try_normalize(f32::EPSILON)
                .unwrap_or(hit.normal);

            // 거칠기 0이면 거울, 1이면 난반사
            let direction = reflected.lerp(&scattered, material.roughness);

            // 에너지 보존은 하지 않음. 반사율이 큰 재질이면 throughput이 계속 커질 수 있음
            let response = material.albedo * ((1.0 - fresnel) / PI) + Vector3::repeat(fresnel);
            throughput.component_mul_assign(&response);

            ray = Ray::new(hit.position + hit.normal * RAY_EPSILON, direction);
        }

        light
    }

    fn trace_ray(&self, ray: &Ray) -> Option<HitPayload> {
        let mut closest: Option<(usize, f32)> = None;

        for (index, shape) in self.scene.shapes.iter().enumerate() {
            let distance = shape.trace(ray);
            if distance.is_nan() || distance <= 0.0 {
                continue;
            }

            // 같은 거리면 먼저 나온 도형이 이김
            match closest {
                Some((_, previous_distance)) if previous_distance <= distance => {}
                _ => closest = Some((index, distance)),
            }
        }

        closest.map(|(index, distance)| self.closest_hit(ray, distance, index))
    }

    fn closest_hit(&self, ray: &Ray, distance: f32, shape_index: usize) -> HitPayload {
        let hit = self.scene.shapes[shape_index].closest_hit(ray, distance);

        HitPayload { shape_index, ..hit }
    }
}

fn reflect(direction: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    direction - normal * (2.0 * direction.dot(normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCamera {
        position: Point3<f32>,
        rays: Vec<Vector3<f32>>,
    }

    impl CameraView for FixedCamera {
        fn position(&self) -> Point3<f32> {
            self.position
        }

        fn ray_directions(&self) -> &[Vector3<f32>] {
            &self.rays
        }
    }

    fn context<'a>(scene: &'a Scene, rays: &'a [Vector3<f32>], bounce_limit: u32) -> RenderContext<'a> {
        RenderContext {
            scene,
            origin: Point3::new(0.0, 0.0, 5.0),
            rays,
            frame_index: 1,
            bounce_limit,
        }
    }

    fn two_material_scene() -> Scene {
        let mut scene = Scene::new(Vector3::new(0.6, 0.7, 0.9));
        scene.add_material(Material::default());
        scene.add_material(Material::default());
        scene
    }

    #[test]
    fn test_trace_ray_picks_closest() {
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::new(0.0, 0.0, -5.0), 1.0, 0));
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 1));

        let ctx = context(&scene, &[], 1);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let hit = ctx.trace_ray(&ray).expect("ray should hit");

        assert_eq!(hit.shape_index, 1);
        assert_eq!(hit.material_index, 1);
        assert!((hit.distance - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_trace_ray_tie_keeps_first_shape() {
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 0));
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 1));

        let ctx = context(&scene, &[], 1);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let hit = ctx.trace_ray(&ray).expect("ray should hit");

        assert_eq!(hit.shape_index, 0);
        assert_eq!(hit.material_index, 0);
    }

    #[test]
    fn test_trace_ray_miss() {
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 0));

        let ctx = context(&scene, &[], 1);
        assert!(ctx.trace_ray(&Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::x())).is_none());
        assert!(ctx.trace_ray(&Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::zeros())).is_none());
    }

    #[test]
    fn test_trace_ray_rejects_hit_behind_origin() {
        // 구 안에서 쏘면 가까운 근이 음수라서 맞지 않은 것으로 침
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 0));

        let ctx = context(&scene, &[], 1);
        assert!(ctx.trace_ray(&Ray::new(Point3::origin(), Vector3::x())).is_none());
    }

    #[test]
    fn test_miss_returns_sky() {
        let scene = two_material_scene();
        let ctx = context(&scene, &[], 15);

        let light = ctx.trace_path(Ray::new(Point3::origin(), Vector3::y()), 1);
        assert_eq!(light, scene.sky_color);
    }

    #[test]
    fn test_emission_only_pixel() {
        let mut scene = two_material_scene();
        let light = scene.add_material(Material {
            albedo: Vector3::new(0.8, 0.5, 0.2),
            roughness: 0.1,
            metallic: 0.3,
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_power: 2.0,
        });
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, light));

        let rays = [-Vector3::z()];
        let ctx = context(&scene, &rays, 1);
        let color = ctx.per_pixel(0);

        assert_eq!(color.xyz(), scene.materials[light].emission());
        assert_eq!(color.w, 1.0);
    }

    #[test]
    fn test_mirror_bounce_reaches_sky() {
        // 거칠기 0, metallic 1 이면 throughput이 1로 유지되고 반사된 광선이 하늘로 나감
        let mut scene = Scene::new(Vector3::new(0.25, 0.5, 0.75));
        let mirror = scene.add_material(Material {
            roughness: 0.0,
            metallic: 1.0,
            ..Default::default()
        });
        scene.add_shape(Plane::new(Vector3::y(), -1.0, mirror));

        let ctx = context(&scene, &[], 15);
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::new(1.0, -1.0, 0.0).normalize());
        let light = ctx.trace_path(ray, 7);

        assert!((light - scene.sky_color).norm() < 1e-5, "light was {light}");
    }

    fn diffuse_floor_scene(albedo: Vector3<f32>) -> Scene {
        let mut scene = Scene::new(Vector3::new(0.25, 0.5, 0.75));
        let floor = scene.add_material(Material {
            albedo,
            roughness: 1.0,
            metallic: 0.0,
            ..Default::default()
        });
        scene.add_shape(Plane::new(Vector3::y(), -1.0, floor));
        scene
    }

    #[test]
    fn test_diffuse_bounce_at_normal_incidence() {
        // 수직으로 맞으면 fresnel이 0이라 albedo / PI 만 곱해짐. 튕긴 광선은 위로 나가 하늘에 닿음
        let albedo = Vector3::new(0.9, 0.6, 0.3);
        let scene = diffuse_floor_scene(albedo);

        let ctx = context(&scene, &[], 2);
        let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), -Vector3::y());
        let light = ctx.trace_path(ray, 99);

        let expected = scene.sky_color.component_mul(&(albedo / PI));
        assert!((light - expected).norm() < 1e-6, "light was {light}, expected {expected}");
    }

    #[test]
    fn test_diffuse_bounce_fresnel_at_oblique_angle() {
        // cos = 0.5 이면 fresnel = (1 - 0.5)^5
        let albedo = Vector3::new(0.9, 0.6, 0.3);
        let scene = diffuse_floor_scene(albedo);

        let ctx = context(&scene, &[], 2);
        let direction = Vector3::new(3.0_f32.sqrt() / 2.0, -0.5, 0.0);
        let light = ctx.trace_path(Ray::new(Point3::new(0.0, 5.0, 0.0), direction), 99);

        let fresnel = 0.5_f32.powi(5);
        let response = albedo * ((1.0 - fresnel) / PI) + Vector3::repeat(fresnel);
        let expected = scene.sky_color.component_mul(&response);
        assert!((light - expected).norm() < 1e-5, "light was {light}, expected {expected}");
    }

    // 빛나는 천장과 거친 바닥 사이를 오가는 광선. 튕기는 각도에 따라 fresnel이 달라져서
    // 난수가 조금만 달라도 결과가 달라짐
    fn glowing_corridor() -> Scene {
        let mut scene = Scene::new(Vector3::new(0.25, 0.5, 0.75));
        let floor = scene.add_material(Material {
            albedo: Vector3::new(0.8, 0.8, 0.8),
            roughness: 1.0,
            ..Default::default()
        });
        let ceiling = scene.add_material(Material {
            albedo: Vector3::new(0.7, 0.7, 0.7),
            roughness: 1.0,
            emission_color: Vector3::new(1.0, 1.0, 1.0),
            emission_power: 3.0,
            ..Default::default()
        });
        scene.add_shape(Plane::new(Vector3::y(), -1.0, floor));
        scene.add_shape(Plane::new(-Vector3::y(), -1.0, ceiling));
        scene
    }

    #[test]
    fn test_pixel_samples_change_with_frame_index() {
        let scene = glowing_corridor();
        let rays = [-Vector3::y(); 4];
        let mut ctx = context(&scene, &rays, 6);

        let first = ctx.per_pixel(3);
        assert_eq!(ctx.per_pixel(3), first);

        ctx.frame_index = 2;
        let second = ctx.per_pixel(3);
        assert_eq!(ctx.per_pixel(3), second);

        assert_ne!(first, second);
    }

    #[test]
    fn test_pixel_samples_change_with_pixel_index() {
        let scene = glowing_corridor();
        let rays = [-Vector3::y(); 4];
        let ctx = context(&scene, &rays, 6);

        // 같은 광선이어도 픽셀마다 다른 난수를 씀
        assert_ne!(ctx.per_pixel(1), ctx.per_pixel(2));
    }

    #[test]
    fn test_same_seed_same_radiance() {
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 0));
        scene.add_shape(Plane::new(Vector3::y(), -1.0, 1));

        let ctx = context(&scene, &[], 15);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        assert_eq!(ctx.trace_path(ray, 12345), ctx.trace_path(ray, 12345));
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(&Vector3::new(1.0, -1.0, 0.0), &Vector3::y());
        assert_eq!(reflected, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_render_rejects_invalid_material() {
        let mut scene = two_material_scene();
        scene.add_shape(Sphere::new(Vector3::zeros(), 1.0, 9));
        let camera = FixedCamera {
            position: Point3::new(0.0, 0.0, 5.0),
            rays: vec![-Vector3::z()],
        };

        let mut lantern = Lantern::new(1, 1);
        let result = lantern.render(&scene, &camera);

        assert!(matches!(
            result,
            Err(RenderError::Scene(SceneError::InvalidMaterial { index: 9, .. }))
        ));
        assert_eq!(lantern.frame_index(), 1);
    }

    #[test]
    fn test_render_rejects_mismatched_camera() {
        let scene = two_material_scene();
        let camera = FixedCamera {
            position: Point3::origin(),
            rays: vec![Vector3::z(); 3],
        };

        let mut lantern = Lantern::new(2, 2);
        assert_eq!(
            lantern.render(&scene, &camera),
            Err(RenderError::ViewportMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_render_sky_only_pixels() {
        let scene = Scene::new(Vector3::new(0.25, 0.5, 0.75));
        let camera = FixedCamera {
            position: Point3::origin(),
            rays: vec![Vector3::z(); 4],
        };

        let mut lantern = Lantern::new(2, 2);
        lantern.render(&scene, &camera).expect("render should succeed");

        // (0.25, 0.5, 0.75) -> (64, 128, 191)
        let expected = (255 << 24) | (191 << 16) | (128 << 8) | 64;
        assert!(lantern.final_image().pixels().iter().all(|pixel| *pixel == expected));
        assert_eq!(lantern.frame_index(), 2);
    }

    #[test]
    fn test_resize_resets_frame_index() {
        let scene = two_material_scene();
        let camera = FixedCamera {
            position: Point3::origin(),
            rays: vec![Vector3::z(); 4],
        };

        let mut lantern = Lantern::new(2, 2);
        lantern.render(&scene, &camera).expect("render should succeed");
        lantern.resize(2, 2);
        assert_eq!(lantern.frame_index(), 2);

        lantern.resize(4, 1);
        assert_eq!(lantern.frame_index(), 1);
        assert_eq!(lantern.final_image().size(), (4, 1));
        assert_eq!(lantern.accumulation().len(), 4);
    }

    #[test]
    fn test_zero_sized_viewport() {
        let scene = two_material_scene();
        let camera = FixedCamera {
            position: Point3::origin(),
            rays: vec![],
        };

        let mut lantern = Lantern::new(0, 3);
        assert_eq!(lantern.render(&scene, &camera), Ok(()));
        assert!(lantern.final_image().pixels().is_empty());
    }
}
