//! Built-in streaming routines for the bootstrap classes.
use crate::core::error::{Result, RootError};
use crate::core::framing::skip_record;
use crate::core::header::tkey_header;
use crate::core::value::{Array, Object, ScalarKind, Value};
use crate::streamer::buffer::DecodeBuffer;
use crate::streamer::dispatch::Hardcoded;
use crate::streamer::type_code::{K_BOOL, K_UCHAR};

bitflags! {
    /// Status bits stored in `TObject::fBits`
    pub struct TObjectBits: u32 {
        const CAN_DELETE = 1 << 0;
        const MUST_CLEANUP = 1 << 3;
        const IS_REFERENCED = 1 << 4;
        const HAS_UUID = 1 << 5;
        const CANNOT_PICK = 1 << 6;
        const NO_CONTEXT_MENU = 1 << 8;
        const IS_ON_HEAP = 0x0100_0000;
        const NOT_DELETED = 0x0200_0000;
        const ZOMBIE = 0x0400_0000;
    }
}

impl<'r> DecodeBuffer<'r> {
    pub(crate) fn read_hardcoded(&mut self, routine: Hardcoded, obj: &mut Object) -> Result<()> {
        match routine {
            Hardcoded::TObject => self.read_tobject(obj),
            Hardcoded::TQObject => Ok(()),
            Hardcoded::TNamed => self.read_tnamed(obj),
            Hardcoded::TObjString => self.read_tobjstring(obj),
            Hardcoded::TList => self.read_tlist(obj),
            Hardcoded::TObjArray => self.read_tobjarray(obj),
            Hardcoded::TClonesArray => self.read_tclonesarray(obj),
            Hardcoded::TCollection => self.read_tcollection(obj),
            Hardcoded::TPolyMarker3D => self.read_tpolymarker3d(obj),
            Hardcoded::TCanvas => self.read_tcanvas(obj),
            Hardcoded::TStreamerInfo => self.read_tstreamerinfo(obj),
            Hardcoded::TStreamerElement => self.read_streamer_element(obj),
            Hardcoded::TStreamerBase => self.read_streamer_base(obj),
            Hardcoded::TStreamerBasicPointer => self.read_streamer_basic_pointer(obj),
            Hardcoded::TStreamerSTL => self.read_streamer_stl(obj),
            Hardcoded::TStreamerSTLstring => self.read_streamer_stlstring(obj),
            Hardcoded::TStreamerSubElement => self.read_streamer_sub_element(obj, 1),
            Hardcoded::TStreamerObjectAnyPointer => self.read_streamer_sub_element(obj, 0),
            Hardcoded::TBasket => self.read_tbasket(obj),
        }
    }

    fn tstring(&mut self) -> Result<Value> {
        Ok(Value::Str(self.cursor.read_tstring()?))
    }

    fn i32_value(&mut self) -> Result<Value> {
        Ok(Value::Int(self.cursor.read_i32()? as i64))
    }

    fn u32_value(&mut self) -> Result<Value> {
        Ok(Value::UInt(self.cursor.read_u32()? as u64))
    }

    /// `TObject` header: a bare version, the unique id and the status bits.
    pub(crate) fn read_tobject(&mut self, obj: &mut Object) -> Result<()> {
        self.cursor.read_u16()?;
        let unique_id = self.cursor.read_u32()?;
        let bits = self.cursor.read_u32()?;
        obj.set("fUniqueID", Value::UInt(unique_id as u64));
        obj.set("fBits", Value::UInt(bits as u64));
        if TObjectBits::from_bits_truncate(bits).contains(TObjectBits::IS_REFERENCED) {
            // process id of the referenced object
            self.cursor.read_u16()?;
        }
        Ok(())
    }

    pub(crate) fn read_tnamed(&mut self, obj: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_tobject(obj)?;
        let name = self.tstring()?;
        obj.set("fName", name);
        let title = self.tstring()?;
        obj.set("fTitle", title);
        self.check(&ver, "TNamed")?;
        Ok(())
    }

    fn read_tobjstring(&mut self, obj: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_tobject(obj)?;
        let s = self.tstring()?;
        obj.set("fString", s);
        self.check(&ver, "TObjString")?;
        Ok(())
    }

    fn read_tlist(&mut self, list: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        let mut name = String::new();
        let mut arr = Vec::new();
        let mut opt = Vec::new();
        if ver.version > 3 {
            self.read_tobject(list)?;
            name = self.cursor.read_tstring()?;
            let n = self.cursor.read_u32()?;
            for _ in 0..n {
                arr.push(Value::from(self.read_object_any()?));
                opt.push(self.cursor.read_tstring()?);
            }
        }
        list.set("name", Value::Str(name));
        list.set("arr", Value::List(arr));
        list.set("opt", Value::Array(Array::Str(opt)));
        self.check(&ver, "TList")?;
        Ok(())
    }

    /// Version dependent head shared by the collection classes.
    fn read_collection_head(&mut self, list: &mut Object, version: u16) -> Result<()> {
        if version > 2 {
            self.read_tobject(list)?;
        }
        let name = if version > 1 {
            self.cursor.read_tstring()?
        } else {
            String::new()
        };
        list.set("name", Value::Str(name));
        Ok(())
    }

    fn read_tobjarray(&mut self, list: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_collection_head(list, ver.version)?;
        let n = self.cursor.read_u32()?;
        let lower_bound = self.i32_value()?;
        list.set("fLowerBound", lower_bound);
        let mut arr = Vec::new();
        for _ in 0..n {
            arr.push(Value::from(self.read_object_any()?));
        }
        list.set("arr", Value::List(arr));
        self.check(&ver, "TObjArray")?;
        Ok(())
    }

    fn read_tclonesarray(&mut self, list: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_collection_head(list, ver.version)?;
        let descriptor = self.cursor.read_tstring()?;
        let (class_name, class_version) = match descriptor.split_once(';') {
            Some((name, version)) => (name.to_string(), version.trim().parse::<i64>().unwrap_or(0)),
            None => (descriptor.clone(), 0),
        };
        // old files stored the count negated
        let n = self.cursor.read_i32()?.unsigned_abs();
        let lower_bound = self.i32_value()?;
        list.set("fClassName", Value::Str(class_name.clone()));
        list.set("fClassVersion", Value::Int(class_version));
        list.set("fLowerBound", lower_bound);
        let mut arr = Vec::new();
        for _ in 0..n {
            arr.push(Value::Object(self.read_embedded(&class_name)?));
        }
        list.set("arr", Value::List(arr));
        self.check(&ver, "TClonesArray")?;
        Ok(())
    }

    /// Abstract base of the collections; its elements cannot be read and are skipped.
    fn read_tcollection(&mut self, list: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_collection_head(list, ver.version)?;
        let n = self.cursor.read_u32()?;
        list.set("arr", Value::List(vec![Value::Null; n.min(1 << 16) as usize]));
        if ver.byte_count.is_some() {
            skip_record(&mut self.cursor, &ver)?;
        }
        Ok(())
    }

    fn read_tpolymarker3d(&mut self, marker: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_tobject(marker)?;
        self.class_streamer(marker, "TAttMarker")?;
        let n = self.cursor.read_i32()?;
        marker.set("fN", Value::Int(n as i64));
        let points = self
            .cursor
            .read_fast_array(n.max(0) as usize * 3, ScalarKind::F32)?;
        marker.set("fP", Value::Array(points));
        let option = self.tstring()?;
        marker.set("fOption", option);
        let name = if ver.version > 1 {
            self.tstring()?
        } else {
            Value::Str("TPolyMarker3D".to_string())
        };
        marker.set("fName", name);
        self.check(&ver, "TPolyMarker3D")?;
        Ok(())
    }

    fn read_tcanvas(&mut self, canvas: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.class_streamer(canvas, "TPad")?;
        let display = self.tstring()?;
        canvas.set("fDISPLAY", display);
        let double_buffer = self.i32_value()?;
        canvas.set("fDoubleBuffer", double_buffer);
        let retained = self.cursor.read_u8()? != 0;
        canvas.set("fRetained", Value::Bool(retained));
        for field in ["fXsizeUser", "fYsizeUser", "fXsizeReal", "fYsizeReal"] {
            let size = self.cursor.read_f32()?;
            canvas.set(field, Value::Float(size as f64));
        }
        for field in [
            "fWindowTopX",
            "fWindowTopY",
            "fWindowWidth",
            "fWindowHeight",
        ] {
            let v = self.i32_value()?;
            canvas.set(field, v);
        }
        let cw = self.u32_value()?;
        canvas.set("fCw", cw);
        let ch = self.u32_value()?;
        canvas.set("fCh", ch);
        let catt = self.read_embedded("TAttCanvas")?;
        canvas.set("fCatt", Value::Object(catt));
        // kMoveOpaque, kResizeOpaque
        self.cursor.read_u8()?;
        self.cursor.read_u8()?;
        let highlight = self.cursor.read_i16()?;
        canvas.set("fHighLightColor", Value::Int(highlight as i64));
        let batch = self.cursor.read_u8()? != 0;
        canvas.set("fBatch", Value::Bool(batch));
        // kShowEventStatus, kAutoExec, kMenuBar
        self.cursor.read_bytes(3)?;
        self.check(&ver, "TCanvas")?;
        Ok(())
    }

    fn read_tstreamerinfo(&mut self, info: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        if ver.version > 1 {
            self.read_tnamed(info)?;
            let checksum = self.u32_value()?;
            info.set("fCheckSum", checksum);
            let class_version = self.i32_value()?;
            info.set("fClassVersion", class_version);
            let elements = self.read_object_any()?;
            info.set("fElements", Value::from(elements));
        }
        self.check(&ver, "TStreamerInfo")?;
        Ok(())
    }

    fn read_streamer_element(&mut self, element: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_tnamed(element)?;
        let mut type_code = self.cursor.read_i32()?;
        for field in ["fSize", "fArrayLength", "fArrayDim"] {
            let v = self.i32_value()?;
            element.set(field, v);
        }
        let n = if ver.version == 1 {
            self.cursor.read_u32()? as usize
        } else {
            5
        };
        let max_index = self.cursor.read_fast_array(n, ScalarKind::I32)?;
        element.set("fMaxIndex", Value::Array(max_index));
        let type_name = self.cursor.read_tstring()?;
        if type_code == K_UCHAR && (type_name == "Bool_t" || type_name == "bool") {
            type_code = K_BOOL;
        }
        element.set("fType", Value::Int(type_code as i64));
        element.set("fTypeName", Value::Str(type_name));
        if ver.version == 3 {
            for field in ["fXmin", "fXmax", "fFactor"] {
                let v = self.cursor.read_f64()?;
                element.set(field, Value::Float(v));
            }
        }
        self.check(&ver, "TStreamerElement")?;
        Ok(())
    }

    fn read_streamer_base(&mut self, element: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_streamer_element(element)?;
        if ver.version > 2 {
            let base_version = self.i32_value()?;
            element.set("fBaseVersion", base_version);
        }
        self.check(&ver, "TStreamerBase")?;
        Ok(())
    }

    /// Element classes without members of their own; `min_version` is the last
    /// version that did not yet stream the element.
    fn read_streamer_sub_element(&mut self, element: &mut Object, min_version: u16) -> Result<()> {
        let ver = self.read_version()?;
        if ver.version > min_version {
            self.read_streamer_element(element)?;
        }
        self.check(&ver, "TStreamerElement subclass")?;
        Ok(())
    }

    fn read_streamer_basic_pointer(&mut self, element: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        if ver.version > 1 {
            self.read_streamer_element(element)?;
            let count_version = self.i32_value()?;
            element.set("fCountVersion", count_version);
            let count_name = self.tstring()?;
            element.set("fCountName", count_name);
            let count_class = self.tstring()?;
            element.set("fCountClass", count_class);
        }
        self.check(&ver, "TStreamerBasicPointer")?;
        Ok(())
    }

    fn read_streamer_stl(&mut self, element: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        if ver.version > 1 {
            self.read_streamer_element(element)?;
            let stl_type = self.i32_value()?;
            element.set("fSTLtype", stl_type);
            let ctype = self.i32_value()?;
            element.set("fCtype", ctype);
        }
        self.check(&ver, "TStreamerSTL")?;
        Ok(())
    }

    fn read_streamer_stlstring(&mut self, element: &mut Object) -> Result<()> {
        let ver = self.read_version()?;
        self.read_streamer_stl(element)?;
        self.check(&ver, "TStreamerSTLstring")?;
        Ok(())
    }

    /// Basket header only; the payload is skipped.
    fn read_tbasket(&mut self, basket: &mut Object) -> Result<()> {
        let key = self.cursor.parse_with(tkey_header)?;
        basket.set("fNbytes", Value::Int(key.nbytes as i64));
        basket.set("fObjlen", Value::UInt(key.obj_len as u64));
        basket.set("fKeylen", Value::UInt(key.key_len as u64));
        basket.set("fCycle", Value::UInt(key.cycle as u64));
        basket.set("fSeekKey", Value::UInt(key.seek_key));
        basket.set("fClassName", Value::Str(key.class_name));
        basket.set("fName", Value::Str(key.name));
        basket.set("fTitle", Value::Str(key.title));

        let ver = self.read_version()?;
        for field in ["fBufferSize", "fNevBufSize", "fNevBuf"] {
            let v = self.i32_value()?;
            basket.set(field, v);
        }
        let last = self.cursor.read_i32()?;
        basket.set("fLast", Value::Int(last as i64));
        let flag = self.cursor.read_i8()?;
        if flag % 10 != 2 {
            // fEntryOffset, then fDisplacement
            self.skip_counted(4)?;
            if flag > 40 {
                self.skip_counted(4)?;
            }
        }
        if flag == 1 || flag > 10 {
            let size = if ver.version <= 1 {
                self.cursor.read_i32()?
            } else {
                last
            };
            self.skip_len(size)?;
        }
        self.check(&ver, "TBasket")?;
        Ok(())
    }

    fn skip_counted(&mut self, width: i64) -> Result<()> {
        let n = self.cursor.read_i32()? as i64;
        self.skip_len(n.saturating_mul(width))
    }

    fn skip_len<N: Into<i64>>(&mut self, n: N) -> Result<()> {
        let n = n.into();
        if n < 0 {
            return Err(RootError::format(format!("negative length {} in basket", n)));
        }
        self.cursor.shift(n as isize)
    }
}
