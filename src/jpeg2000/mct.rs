//! Multiple component transforms applied to the first three components.

/// Reversible color transform (RCT).
pub fn forward_rct(planes: &mut [Vec<i32>]) {
    let [r, g, b, ..] = planes else {
        return;
    };
    for ((r, g), b) in r.iter_mut().zip(g.iter_mut()).zip(b.iter_mut()) {
        // Y = floor((R + 2G + B) / 4), Cb = B - G, Cr = R - G
        let y = (*r + 2 * *g + *b) >> 2;
        let cb = *b - *g;
        let cr = *r - *g;
        *r = y;
        *g = cb;
        *b = cr;
    }
}

pub fn inverse_rct(planes: &mut [Vec<i32>]) {
    let [y, cb, cr, ..] = planes else {
        return;
    };
    for ((y, cb), cr) in y.iter_mut().zip(cb.iter_mut()).zip(cr.iter_mut()) {
        let g = y.wrapping_sub(cb.wrapping_add(*cr) >> 2);
        let r = cr.wrapping_add(g);
        let b = cb.wrapping_add(g);
        *y = r;
        *cb = g;
        *cr = b;
    }
}

/// Irreversible color transform (ICT, RGB to YCbCr).
pub fn forward_ict(planes: &mut [Vec<f32>]) {
    let [r, g, b, ..] = planes else {
        return;
    };
    for ((r, g), b) in r.iter_mut().zip(g.iter_mut()).zip(b.iter_mut()) {
        let y = 0.299 * *r + 0.587 * *g + 0.114 * *b;
        let cb = -0.168_75 * *r - 0.331_26 * *g + 0.5 * *b;
        let cr = 0.5 * *r - 0.418_69 * *g - 0.081_31 * *b;
        *r = y;
        *g = cb;
        *b = cr;
    }
}

pub fn inverse_ict(planes: &mut [Vec<f32>]) {
    let [y, cb, cr, ..] = planes else {
        return;
    };
    for ((y, cb), cr) in y.iter_mut().zip(cb.iter_mut()).zip(cr.iter_mut()) {
        let r = *y + 1.402 * *cr;
        let g = *y - 0.344_13 * *cb - 0.714_14 * *cr;
        let b = *y + 1.772 * *cb;
        *y = r;
        *cb = g;
        *cr = b;
    }
}
