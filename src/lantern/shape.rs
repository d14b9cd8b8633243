use nalgebra::{Point3, Vector3};

use crate::lantern::ray::Ray;

/// `trace`가 아무것도 맞추지 못했을 때 돌려주는 거리
pub const MISS: f32 = -1.0;

// 평면과 거의 평행한 광선은 맞지 않은 것으로 침
const PARALLEL_EPSILON: f32 = 1e-4;

// Cherno씨와 같은 디자인 선택, HitPayload는 빛의 경로에 대한 정보만 담고
// 이를 이용해 색상을 알아내는건 나중에 함
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub material_index: usize,
    // 씬 안에서 몇 번째 도형인지. trace_ray가 채움
    pub shape_index: usize,
}

/// 도형이라면 모두 구현해야 하는 교차 검사.
/// 렌더러는 이 두 함수만 부르고 구체적인 도형 종류는 신경쓰지 않음
pub trait Intersect {
    /// 광선이 도형과 만나는 거리. 못 만나면 음수([`MISS`])
    fn trace(&self, ray: &Ray) -> f32;

    /// `trace`로 구한 거리에서의 위치와 법선
    fn closest_hit(&self, ray: &Ray, distance: f32) -> HitPayload;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub position: Vector3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Sphere {
    pub fn new(position: Vector3<f32>, radius: f32, material_index: usize) -> Self {
        Self {
            position,
            radius,
            material_index,
        }
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            radius: 1.0,
            material_index: 0,
        }
    }
}

impl Intersect for Sphere {
    fn trace(&self, ray: &Ray) -> f32 {
        // (bx^2 + by^2 + bz^2) * t^2 + 2 * (ax * bx + ay * by + az * bz) * t + (ax^2 + ay^2 + az^2 - r^2) = 0
        // 이 식은 구가 원점에 존재할 것을 가정하고 작성한 것. 구가 원점에 존재하지 않을 때는 그만큼 광선을 이동시켜 해결함.
        let origin = ray.origin.coords - self.position;

        let a = ray.direction.magnitude_squared();
        // 방향이 0이면 a로 나눌 수가 없음
        if a == 0.0 {
            return MISS;
        }
        let b = 2.0 * origin.dot(&ray.direction);
        let c = origin.magnitude_squared() - self.radius * self.radius;

        // 판별식
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return MISS;
        }

        // 가까운 근만 씀. 광선 뒤쪽(음수)이어도 그대로 돌려주고 거르는 건 trace_ray 몫
        (-b - discriminant.sqrt()) / (2.0 * a)
    }

    fn closest_hit(&self, ray: &Ray, distance: f32) -> HitPayload {
        let local = (ray.origin.coords - self.position) + ray.direction * distance;
        let normal = local
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -ray.direction.normalize());

        HitPayload {
            distance,
            position: Point3::from(local + self.position),
            normal,
            material_index: self.material_index,
            shape_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    // 법선 방향으로의 부호 있는 거리
    pub distance: f32,
    pub material_index: usize,
}

impl Plane {
    pub fn new(normal: Vector3<f32>, distance: f32, material_index: usize) -> Self {
        Self {
            normal,
            distance,
            material_index,
        }
    }
}

impl Intersect for Plane {
    fn trace(&self, ray: &Ray) -> f32 {
        let denom = self.normal.dot(&ray.direction);
        if denom.abs() <= PARALLEL_EPSILON {
            return MISS;
        }

        let t = (self.distance - self.normal.dot(&ray.origin.coords)) / denom;
        if t >= 0.0 {
            t
        } else {
            MISS
        }
    }

    fn closest_hit(&self, ray: &Ray, distance: f32) -> HitPayload {
        HitPayload {
            distance,
            position: ray.at(distance),
            // 평면의 법선은 어디서나 같음
            normal: self.normal,
            material_index: self.material_index,
            shape_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Plane(Plane),
}

impl Shape {
    pub fn material_index(&self) -> usize {
        match self {
            Shape::Sphere(sphere) => sphere.material_index,
            Shape::Plane(plane) => plane.material_index,
        }
    }

    pub fn material_index_mut(&mut self) -> &mut usize {
        match self {
            Shape::Sphere(sphere) => &mut sphere.material_index,
            Shape::Plane(plane) => &mut plane.material_index,
        }
    }

    // 편집기에서 "위치"로 보여주는 값. 평면은 위치가 없으니 법선을 대신 씀
    pub fn position(&self) -> Vector3<f32> {
        match self {
            Shape::Sphere(sphere) => sphere.position,
            Shape::Plane(plane) => plane.normal,
        }
    }

    pub fn position_mut(&mut self) -> &mut Vector3<f32> {
        match self {
            Shape::Sphere(sphere) => &mut sphere.position,
            Shape::Plane(plane) => &mut plane.normal,
        }
    }
}

impl Intersect for Shape {
    fn trace(&self, ray: &Ray) -> f32 {
        match self {
            Shape::Sphere(sphere) => sphere.trace(ray),
            Shape::Plane(plane) => plane.trace(ray),
        }
    }

    fn closest_hit(&self, ray: &Ray, distance: f32) -> HitPayload {
        match self {
            Shape::Sphere(sphere) => sphere.closest_hit(ray, distance),
            Shape::Plane(plane) => plane.closest_hit(ray, distance),
        }
    }
}

impl From<Sphere> for Shape {
    fn from(sphere: Sphere) -> Self {
        Shape::Sphere(sphere)
    }
}

impl From<Plane> for Shape {
    fn from(plane: Plane) -> Self {
        Shape::Plane(plane)
    }
}
