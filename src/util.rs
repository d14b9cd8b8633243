use nalgebra::Vector3;

// 전역 RNG 대신 시드를 직접 넘겨받는 PCG 해시.
// 픽셀마다 시드가 다르니 rayon 작업끼리 공유하는 상태가 없음
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// `[0, 1]` 범위의 난수. 시드는 호출할 때마다 갱신됨
pub fn random_float(seed: &mut u32) -> f32 {
    *seed = pcg_hash(*seed);
    *seed as f32 / u32::MAX as f32
}

// 정육면체 [-1, 1]^3 에서 뽑아서 정규화하는 방식이라 구면 위에 균일하지 않음 (모서리 쪽이 더 자주 나옴).
// 렌더 결과가 이 분포에 맞춰져 있으니 고치지 말 것
pub fn random_unit_vec(seed: &mut u32) -> Vector3<f32> {
    let v = Vector3::new(
        random_float(seed) * 2.0 - 1.0,
        random_float(seed) * 2.0 - 1.0,
        random_float(seed) * 2.0 - 1.0,
    );

    // 세 값이 전부 0이 나오는 경우는 사실상 없지만 NaN은 막아둠
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y)
}
