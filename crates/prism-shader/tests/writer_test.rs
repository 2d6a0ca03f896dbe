// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use prism_core::renderer::api::ShaderStage;
use prism_shader::writer::{Float, Int, Param, ShaderWriter, Vec4, Void};
use std::cell::Cell;

#[test]
fn functions_are_emitted_once_per_writer() {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    let emitted = Cell::new(0);
    let square = |writer: &ShaderWriter| {
        writer.implement_function::<Float>("Square", &[Param::new::<Float>("x")], |params| {
            emitted.set(emitted.get() + 1);
            let x = params.get::<Float>(0);
            writer.return_(writer.mul(x, x));
        })
    };

    let first = square(&writer);
    let second = square(&writer);
    assert_eq!(emitted.get(), 1);
    assert_eq!(first.name(), second.name());
    assert_eq!(writer.source().matches("float Square(float x)").count(), 1);
    assert!(writer.is_declared("Square"));

    let other = ShaderWriter::new(ShaderStage::Fragment);
    square(&other);
    assert_eq!(emitted.get(), 2);
}

#[test]
fn nested_blocks_are_indented_by_depth() {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    writer.implement_function::<Float>("Count", &[Param::new::<Int>("count")], |params| {
        let count = params.get::<Int>(0);
        let total = writer.decl_locale("total", writer.float(0.0));
        writer.for_range("i", writer.int(0), count, |i| {
            writer
                .if_(writer.gt(i, writer.int(2)), || {
                    writer.add_assign(total, writer.float(1.0));
                })
                .else_(|| {
                    writer.sub_assign(total, writer.float(1.0));
                });
        });
        writer.return_(total);
    });

    let expected = concat!(
        "float Count(int count)\n",
        "{\n",
        "    float total = 0.0;\n",
        "    for (int i = 0; i < count; ++i)\n",
        "    {\n",
        "        if ((i > 2))\n",
        "        {\n",
        "            total += 1.0;\n",
        "        }\n",
        "        else\n",
        "        {\n",
        "            total -= 1.0;\n",
        "        }\n",
        "    }\n",
        "    return total;\n",
        "}\n",
        "\n",
    );
    assert_eq!(writer.source(), expected);
}

#[test]
fn calls_refer_to_the_declared_function() {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    let colour = writer.decl_output::<Vec4>("pxl_colour", 0);
    let grey = writer.implement_function::<Vec4>("Grey", &[Param::new::<Float>("v")], |p| {
        let v = p.get::<Float>(0);
        writer.return_(writer.construct::<Vec4>(&[v.any()]));
    });
    writer.implement_function::<Void>("main", &[], |_| {
        writer.assign(colour, grey.call(&writer, &[writer.float(0.5).any()]));
    });

    let text = writer.finalise();
    assert!(text.starts_with("#version 450\n"));
    assert!(text.contains("    pxl_colour = Grey(0.5);\n"));
    assert!(text.find("vec4 Grey(float v)") < text.find("void main()"));
}

#[test]
#[should_panic(expected = "implemented inside another function")]
fn functions_cannot_nest() {
    let writer = ShaderWriter::new(ShaderStage::Fragment);
    writer.implement_function::<Void>("Outer", &[], |_| {
        writer.implement_function::<Void>("Inner", &[], |_| {});
    });
}
