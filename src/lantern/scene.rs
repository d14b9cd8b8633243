use nalgebra::Vector3;

use crate::lantern::error::SceneError;
use crate::lantern::shape::Shape;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub roughness: f32,
    pub metallic: f32,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

// 재질은 도형이 소유하지 않고 씬에 모아둠. 도형은 인덱스로만 참조
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub shapes: Vec<Shape>,
    pub materials: Vec<Material>,
    pub sky_color: Vector3<f32>,
}

impl Scene {
    pub fn new(sky_color: Vector3<f32>) -> Self {
        Self {
            shapes: vec![],
            materials: vec![],
            sky_color,
        }
    }

    /// 재질을 추가하고 그 인덱스를 돌려줌
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_shape(&mut self, shape: impl Into<Shape>) {
        self.shapes.push(shape.into());
    }

    // 모든 도형의 재질 인덱스가 materials 범위 안인지 확인
    pub fn validate(&self) -> Result<(), SceneError> {
        let count = self.materials.len();
        for (shape, object) in self.shapes.iter().enumerate() {
            let index = object.material_index();
            if index >= count {
                return Err(SceneError::InvalidMaterial {
                    shape,
                    index,
                    count,
                });
            }
        }

        Ok(())
    }
}
