use nalgebra::{Isometry3, Perspective3, Point3, Unit, Vector2, Vector3};
use rayon::prelude::*;

use crate::lantern::CameraView;

pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    rays: Vec<Vector3<f32>>,

    width: u32,
    height: u32,
}

impl Camera {
    // vertical_fov는 라디안
    pub fn new(vertical_fov: f32, near: f32, far: f32, width: u32, height: u32) -> Self {
        let position = Point3::new(0.0, 0.0, 6.0);
        let forward = -Vector3::z_axis();

        let mut to_return = Self {
            projection: Self::perspective(width, height, vertical_fov, near, far),
            view: Self::look_at(&position, &forward),
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            width,
            height,
        };

        to_return.reevaluate_rays();

        to_return
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }

        self.width = width;
        self.height = height;

        self.projection =
            Self::perspective(width, height, self.vertical_fov, self.near, self.far);
        self.reevaluate_rays();
    }

    /// 카메라를 옮김. 실제로 바뀐게 있으면 true, 이때 렌더러의 누적을 초기화해야 함
    pub fn set_pose(&mut self, position: Point3<f32>, forward: Vector3<f32>) -> bool {
        let Some(forward) = Unit::try_new(forward, f32::EPSILON) else {
            return false;
        };
        if position == self.position && forward == self.forward {
            return false;
        }

        self.position = position;
        self.forward = forward;
        self.view = Self::look_at(&self.position, &self.forward);
        self.reevaluate_rays();

        true
    }

    pub fn forward(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    fn perspective(width: u32, height: u32, vertical_fov: f32, near: f32, far: f32) -> Perspective3<f32> {
        // 크기가 0인 뷰포트에서도 NaN이 나오지 않게
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Perspective3::new(aspect, vertical_fov, near, far)
    }

    fn look_at(position: &Point3<f32>, forward: &Unit<Vector3<f32>>) -> Isometry3<f32> {
        let target = *position + forward.into_inner();
        // 위나 아래를 똑바로 보면 y축을 up으로 쓸 수 없음
        let up = if forward.y.abs() > 0.999 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        Isometry3::look_at_rh(position, &target, &up)
    }

    fn reevaluate_rays(&mut self) {
        let width = self.width;
        let height = self.height;
        let projection = &self.projection;
        let view = &self.view;

        self.rays = (0..(width as usize) * (height as usize))
            .into_par_iter()
            .map(|index| {
                let y = index as u32 / width;
                let x = index as u32 % width;

                let mut coord = Vector2::new(x as f32 / width as f32, y as f32 / height as f32);
                coord *= 2.0;
                coord -= Vector2::new(1.0, 1.0);

                // NDC 상의 먼 평면 위의 점을 카메라 공간으로 되돌림. 카메라는 -z를 바라봄
                let target = projection.unproject_point(&Point3::new(coord.x, coord.y, 1.0));
                let normalized = target.coords.normalize();

                view.inverse_transform_vector(&normalized)
            })
            .collect();
    }
}

impl CameraView for Camera {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn ray_directions(&self) -> &[Vector3<f32>] {
        &self.rays
    }
}
